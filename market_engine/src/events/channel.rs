//! Simple stateless pub-sub event handler
//!
//! Components of the marketplace publish events (an order was created, paid, shipped...) and hooks subscribe to
//! them. The handlers receive only the event itself, never the engine's internal state. Handlers are async, and each
//! event is handled on its own task so a slow handler (e.g. an e-mail API call) never blocks the publisher.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, and then waits for the in-flight handlers to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Only producers keep the channel open from here on
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move { (handler)(ev).await });
            // Reap finished jobs so the set does not grow without bound on a long-running server
            while let Some(res) = jobs.try_join_next() {
                log_join_result(res);
            }
        }
        debug!("📬️ All producers are gone. Waiting for {} pending jobs", jobs.len());
        while let Some(res) = jobs.join_next().await {
            log_join_result(res);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_join_result(res: Result<(), tokio::task::JoinError>) {
    match res {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event handler task failed: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
