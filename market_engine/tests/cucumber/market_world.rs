use std::{collections::HashMap, sync::Arc, time::Duration};

use cucumber::World;
use log::*;
use market_engine::{
    db_types::{ProductId, VariationId, VendorId},
    events::{EventHandlers, EventHooks},
    notifications::{Notification, NotificationKind, NotificationTemplates},
    order_objects::{CheckoutResult, WebhookOutcome},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        FakeGateway,
        RecordingNotifier,
    },
    CheckoutApi,
    InventoryApi,
    NotificationApi,
    OrderFlowError,
    OrderQueryApi,
    ReconciliationApi,
    SqliteDatabase,
};

pub type Notifier = NotificationApi<SqliteDatabase, RecordingNotifier>;

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
    /// Vendors by store name
    pub vendors: HashMap<String, VendorId>,
    /// Variations by "product/descriptor"
    pub variations: HashMap<String, (ProductId, VariationId)>,
    /// Placed orders by customer name
    pub orders: HashMap<String, CheckoutResult>,
    pub last_error: Option<OrderFlowError>,
    pub last_outcome: Option<WebhookOutcome>,
}

#[derive(Debug)]
pub struct MarketSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub gateway: FakeGateway,
    pub notifier: RecordingNotifier,
    pub checkout: CheckoutApi<SqliteDatabase, FakeGateway>,
    pub reconciliation: ReconciliationApi<SqliteDatabase, FakeGateway>,
    pub query: OrderQueryApi<SqliteDatabase>,
    pub inventory: InventoryApi<SqliteDatabase, FakeGateway>,
    pub notifications: Arc<Notifier>,
}

impl MarketWorld {
    pub fn system(&self) -> &MarketSystem {
        self.system.as_ref().expect("The marketplace has not been initialised")
    }

    pub fn vendor_id(&self, store: &str) -> VendorId {
        *self.vendors.get(store).unwrap_or_else(|| panic!("Unknown vendor {store}"))
    }

    pub fn variation(&self, key: &str) -> (ProductId, VariationId) {
        *self.variations.get(key).unwrap_or_else(|| panic!("Unknown variation {key}"))
    }

    pub fn order(&self, customer: &str) -> &CheckoutResult {
        self.orders.get(customer).unwrap_or_else(|| panic!("{customer} has not placed an order"))
    }

    pub fn record<T>(&mut self, result: Result<T, OrderFlowError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                debug!("🚀️ Operation failed: {e}");
                self.last_error = Some(e);
                None
            },
        }
    }

    /// Waits for the asynchronous notification hooks to catch up, and returns the notifications sent to `email`.
    pub async fn notifications_for(&self, email: &str, kind: NotificationKind, expected: usize) -> Vec<Notification> {
        let notifier = &self.system().notifier;
        let matching = || {
            notifier.sent().into_iter().filter(|n| n.recipient_email == email && n.kind == kind).collect::<Vec<_>>()
        };
        for _ in 0..50 {
            if matching().len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        // Give stray duplicates a chance to show up
        tokio::time::sleep(Duration::from_millis(50)).await;
        matching()
    }
}

impl MarketSystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        let db = prepare_test_env(&db_path).await;
        debug!("🚀️ Created database: {db_path}");
        let gateway = FakeGateway::new();
        let notifier = RecordingNotifier::new();
        let templates = NotificationTemplates::new("https://shop.example.com");
        let notifications = Arc::new(NotificationApi::new(db.clone(), notifier.clone(), templates));
        let handlers = EventHandlers::new(25, hooks(&notifications));
        let producers = handlers.producers();
        handlers.start_handlers();
        Self {
            checkout: CheckoutApi::new(db.clone(), gateway.clone(), producers.clone()),
            reconciliation: ReconciliationApi::new(db.clone(), gateway.clone(), producers),
            query: OrderQueryApi::new(db.clone()),
            inventory: InventoryApi::new(db.clone(), gateway.clone()),
            db_path,
            db,
            gateway,
            notifier,
            notifications,
        }
    }
}

fn hooks(api: &Arc<Notifier>) -> EventHooks {
    let mut hooks = EventHooks::default();
    let a = Arc::clone(api);
    hooks.on_order_created(move |ev| {
        let api = Arc::clone(&a);
        Box::pin(async move { api.on_order_created(ev).await })
    });
    let a = Arc::clone(api);
    hooks.on_order_paid(move |ev| {
        let api = Arc::clone(&a);
        Box::pin(async move { api.on_order_paid(ev).await })
    });
    let a = Arc::clone(api);
    hooks.on_payment_failed(move |ev| {
        let api = Arc::clone(&a);
        Box::pin(async move { api.on_payment_failed(ev).await })
    });
    let a = Arc::clone(api);
    hooks.on_order_shipped(move |ev| {
        let api = Arc::clone(&a);
        Box::pin(async move { api.on_order_shipped(ev).await })
    });
    let a = Arc::clone(api);
    hooks.on_order_declined(move |ev| {
        let api = Arc::clone(&a);
        Box::pin(async move { api.on_order_declined(ev).await })
    });
    hooks
}
