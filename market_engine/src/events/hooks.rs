use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCreatedEvent,
    OrderDeclinedEvent,
    OrderPaidEvent,
    OrderShippedEvent,
    PaymentFailedEvent,
};

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The publishing side of the event hooks. The engine's APIs hold one of these and publish to every producer of the
/// relevant type.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub payment_failed_producer: Vec<EventProducer<PaymentFailedEvent>>,
    pub order_shipped_producer: Vec<EventProducer<OrderShippedEvent>>,
    pub order_declined_producer: Vec<EventProducer<OrderDeclinedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        for producer in &self.order_paid_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payment_failed(&self, event: PaymentFailedEvent) {
        for producer in &self.payment_failed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_shipped(&self, event: OrderShippedEvent) {
        for producer in &self.order_shipped_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_declined(&self, event: OrderDeclinedEvent) {
        for producer in &self.order_declined_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_payment_failed: Option<EventHandler<PaymentFailedEvent>>,
    pub on_order_shipped: Option<EventHandler<OrderShippedEvent>>,
    pub on_order_declined: Option<EventHandler<OrderDeclinedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_created: hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f)),
            on_order_paid: hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f)),
            on_payment_failed: hooks.on_payment_failed.map(|f| EventHandler::new(buffer_size, f)),
            on_order_shipped: hooks.on_order_shipped.map(|f| EventHandler::new(buffer_size, f)),
            on_order_declined: hooks.on_order_declined.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_failed {
            result.payment_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_shipped {
            result.order_shipped_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_declined {
            result.order_declined_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns every configured handler. Each one shuts down once all of its producers have been dropped.
    pub fn start_handlers(self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut tasks = Vec::with_capacity(5);
        if let Some(handler) = self.on_order_created {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_order_paid {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_payment_failed {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_order_shipped {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_order_declined {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        tasks
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_payment_failed: Option<Handler<PaymentFailedEvent>>,
    pub on_order_shipped: Option<Handler<OrderShippedEvent>>,
    pub on_order_declined: Option<Handler<OrderDeclinedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_payment_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentFailedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_payment_failed = Some(Arc::new(f));
        self
    }

    pub fn on_order_shipped<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderShippedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_shipped = Some(Arc::new(f));
        self
    }

    pub fn on_order_declined<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderDeclinedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_declined = Some(Arc::new(f));
        self
    }
}
