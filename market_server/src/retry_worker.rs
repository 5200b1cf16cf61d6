use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use market_engine::{NotificationApi, ReconciliationApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::{
    config::NotificationConfig,
    integrations::{email::EmailClient, stripe::StripeGateway},
};

pub type Notifier = NotificationApi<SqliteDatabase, EmailClient>;
pub type Reconciler = ReconciliationApi<SqliteDatabase, StripeGateway>;

/// Starts the notification retry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `retry_interval_secs`, the worker tries to deliver the notifications in the dead-letter table again. Those
/// that still fail have their attempt count bumped, and are abandoned once they reach `max_attempts`.
pub fn start_retry_worker(api: Arc<Notifier>, config: NotificationConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(Duration::from_secs(config.retry_interval_secs));
        info!("🕰️ Notification retry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running notification retry job");
            match api.retry_failed(config.max_attempts).await {
                Ok(report) => debug!("🕰️ Notification retry job done. {report:?}"),
                Err(e) => error!("🕰️ Error running notification retry job: {e}"),
            }
        }
    })
}

/// Starts the pending refund worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval_secs`, the worker asks the payment processor again about refunds that have been pending for at
/// least that long, i.e. those whose original request got no answer.
pub fn start_refund_worker(api: Arc<Reconciler>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_secs);
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Pending refund worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running pending refund job");
            let cutoff = Utc::now() - chrono::Duration::seconds(interval_secs as i64);
            match api.retry_pending_refunds(cutoff).await {
                Ok(report) => debug!("🕰️ Pending refund job done. {report:?}"),
                Err(e) => error!("🕰️ Error running pending refund job: {e}"),
            }
        }
    })
}
