use std::{path::Path, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use log::*;
use market_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    notifications::NotificationTemplates,
    traits::{MarketplaceDatabase, PaymentGateway},
    CheckoutApi,
    InventoryApi,
    NotificationApi,
    OrderQueryApi,
    ReconciliationApi,
    SqliteDatabase,
};

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    integrations::{email::EmailClient, stripe::StripeGateway},
    retry_worker::{start_refund_worker, start_retry_worker, Notifier},
    routes::{
        health,
        AddVariationRoute,
        ArchiveProductRoute,
        ArchiveVariationRoute,
        ConnectVendorRoute,
        CreateOrderRoute,
        CreateProductRoute,
        OrderByTokenRoute,
        OwnProductsRoute,
        PaymentWebhookRoute,
        ProductRoute,
        RefundOrderRoute,
        SearchOrdersRoute,
        UpdateOrderStatusRoute,
        UpdateProductRoute,
        UpdateVariationRoute,
        VendorCatalogRoute,
        VendorOrderRoute,
    },
};

pub const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    ensure_database_dir(&config.database_url);
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        StripeGateway::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let templates = NotificationTemplates::new(config.storefront_url.as_str());
    let notifier = Arc::new(NotificationApi::new(db.clone(), EmailClient::new(config.email.clone()), templates));
    let handlers = create_notification_handlers(&notifier);
    let producers = handlers.producers();
    // The handlers run until the last producer is dropped, i.e. when the server shuts down.
    let _handles = handlers.start_handlers();
    let _worker = start_retry_worker(notifier, config.notifications);
    let reconciler = Arc::new(ReconciliationApi::new(db.clone(), gateway.clone(), producers.clone()));
    let _refund_worker = start_refund_worker(reconciler, config.refund_retry_secs);
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: StripeGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), producers.clone())
            .with_platform_fee(config.platform_fee_percent);
        let reconciliation_api = ReconciliationApi::new(db.clone(), gateway.clone(), producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let inventory_api = InventoryApi::new(db.clone(), gateway.clone());
        let token_issuer = TokenIssuer::new(&config.auth);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("market::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(token_issuer))
            .configure(configure_extractors)
            .service(health)
            .configure(register_routes::<SqliteDatabase, StripeGateway>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every API route against the given backend and payment gateway.
pub fn register_routes<B, G>(cfg: &mut ServiceConfig)
where
    B: MarketplaceDatabase + 'static,
    G: PaymentGateway + 'static,
{
    cfg.service(PaymentWebhookRoute::<B, G>::new())
        .service(CreateOrderRoute::<B, G>::new())
        .service(SearchOrdersRoute::<B>::new())
        .service(OrderByTokenRoute::<B>::new())
        .service(VendorOrderRoute::<B>::new())
        .service(UpdateOrderStatusRoute::<B, G>::new())
        .service(RefundOrderRoute::<B, G>::new())
        .service(ConnectVendorRoute::<B, G>::new())
        .service(CreateProductRoute::<B, G>::new())
        .service(AddVariationRoute::<B, G>::new())
        // Before the `/product/{id}` routes, which would otherwise claim "vendor" as a product id
        .service(OwnProductsRoute::<B, G>::new())
        .service(VendorCatalogRoute::<B, G>::new())
        .service(ProductRoute::<B, G>::new())
        .service(UpdateProductRoute::<B, G>::new())
        .service(ArchiveProductRoute::<B, G>::new())
        .service(UpdateVariationRoute::<B, G>::new())
        .service(ArchiveVariationRoute::<B, G>::new());
}

/// Makes malformed bodies, paths and query strings fail with the same error envelope as every other error.
pub fn configure_extractors(cfg: &mut ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|e, _req| ServerError::InvalidRequestBody(e.to_string()).into()),
    )
    .app_data(web::PathConfig::default().error_handler(|e, _req| ServerError::InvalidRequestPath(e.to_string()).into()))
    .app_data(
        web::QueryConfig::default().error_handler(|e, _req| ServerError::InvalidRequestBody(e.to_string()).into()),
    );
}

/// Wires the engine's order events to the notification API.
pub fn create_notification_handlers(api: &Arc<Notifier>) -> EventHandlers {
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
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}

/// SQLite creates a missing database file, but not its directory.
fn ensure_database_dir(url: &str) {
    let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) else {
        return;
    };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return;
    }
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("🗃️ Could not create the database directory {}. {e}", dir.display());
        }
    }
}
