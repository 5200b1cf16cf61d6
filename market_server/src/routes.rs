//! Request handler definitions
//!
//! Define each route and its handler here. Handlers only unpack the request, call the relevant engine API and pack
//! up the response. Anything more involved belongs in the engine.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database and payment processor call is therefore awaited,
//! never blocked on.
//!
//! | Method | Path                          | Auth              |
//! |--------|-------------------------------|-------------------|
//! | GET    | /health                       | none              |
//! | POST   | /order                        | none              |
//! | POST   | /order/webhook                | webhook signature |
//! | GET    | /order/{id}/token/{token}     | order token       |
//! | GET    | /order/{id}/vendor            | vendor session    |
//! | GET    | /order                        | vendor session    |
//! | PUT    | /order/{id}                   | vendor session    |
//! | POST   | /order/{id}/refund            | vendor session    |
//! | POST   | /vendor/connect               | vendor session    |
//! | POST   | /product                      | vendor session    |
//! | GET    | /product/vendor               | vendor session    |
//! | GET    | /product/vendor/{vendor_id}   | none              |
//! | POST   | /product/{id}/variation       | vendor session    |
//! | GET    | /product/{id}                 | none              |
//! | PUT    | /product/{id}                 | vendor session    |
//! | DELETE | /product/{id}                 | vendor session    |
//! | PUT    | /variation/{id}               | vendor session    |
//! | DELETE | /variation/{id}               | vendor session    |
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use market_engine::{
    db_types::{
        NewProduct,
        NewVariation,
        OrderId,
        ProductId,
        ProductUpdate,
        VariationId,
        VariationUpdate,
        VendorId,
    },
    order_objects::{CheckoutRequest, OrderQueryFilter, RefundRequest, StatusUpdate},
    traits::{MarketplaceDatabase, PaymentGateway},
    CheckoutApi,
    InventoryApi,
    OrderFlowError,
    OrderQueryApi,
    ReconciliationApi,
};
use stripe_tools::webhook::SIGNATURE_HEADER;

use crate::{auth::VendorClaims, data_objects::OrderSearchParams, errors::ServerError};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_order => Post "/order" impl MarketplaceDatabase, PaymentGateway);
/// Route handler for the checkout endpoint
///
/// Validates the cart against the vendor's inventory, opens a payment intent on the vendor's connected account and
/// stores the order. The response carries the client secret that the storefront uses to collect the payment, and the
/// access token that lets the customer view the order later.
pub async fn create_order<B, G>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST checkout for vendor {} with {} line(s)", request.vendor, request.items.len());
    let result = api.create_order(request).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(payment_webhook => Post "/order/webhook" impl MarketplaceDatabase, PaymentGateway);
/// Route handler for the payment processor's webhook.
///
/// The body is taken as raw bytes, since the signature is computed over the exact payload. Events that do not concern
/// any order, and redeliveries of events that have been processed already, are acknowledged with a 200 so that the
/// processor stops retrying them.
pub async fn payment_webhook<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    trace!("💻️ Received webhook delivery ({} bytes)", body.len());
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| OrderFlowError::SignatureInvalid(format!("Missing {SIGNATURE_HEADER} header")))?;
    let outcome = api.handle_webhook(&body, signature).await.map_err(|e| {
        warn!("💻️ Webhook delivery was not processed. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_token => Get "/order/{id}/token/{token}" impl MarketplaceDatabase);
/// Customer self-service. The access token was handed out at checkout, and is also part of the link in every
/// customer e-mail.
pub async fn order_by_token<B: MarketplaceDatabase>(
    path: web::Path<(OrderId, String)>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (order_id, token) = path.into_inner();
    debug!("💻️ GET {order_id} by access token");
    let order = api.order_by_token(order_id, &token).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(vendor_order => Get "/order/{id}/vendor" impl MarketplaceDatabase);
pub async fn vendor_order<B: MarketplaceDatabase>(
    claims: VendorClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET {order_id} for {}", claims.vendor_id);
    let order = api.order_for_vendor(order_id, claims.vendor_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(search_orders => Get "/order" impl MarketplaceDatabase);
/// Lists the authenticated vendor's orders, newest first.
///
/// Query parameters (all optional):
/// * `status` - comma separated list of statuses, e.g. `paid,confirmed`
/// * `from` - only orders created at or after this time (RFC 3339)
/// * `to` - only orders created before this time (RFC 3339)
pub async fn search_orders<B: MarketplaceDatabase>(
    claims: VendorClaims,
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = OrderQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ GET orders for {}. {filter}", claims.vendor_id);
    let orders = api.search_orders(claims.vendor_id, filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_order_status => Put "/order/{id}" impl MarketplaceDatabase, PaymentGateway);
/// Lets the vendor confirm, ship or decline an order. Declining requires a note, which is passed on to the customer.
pub async fn update_order_status<B, G>(
    claims: VendorClaims,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdate>,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    let StatusUpdate { status, note } = body.into_inner();
    debug!("💻️ PUT {order_id} status={status} by {}", claims.vendor_id);
    let order = api.update_status(order_id, claims.vendor_id, status, note).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(refund_order => Post "/order/{id}/refund" impl MarketplaceDatabase, PaymentGateway);
/// Refunds part or all of a paid order. Without an `amount` (or without a body), everything that has not been refunded
/// yet is refunded.
pub async fn refund_order<B, G>(
    claims: VendorClaims,
    path: web::Path<OrderId>,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RefundRequest::default()
    } else {
        serde_json::from_slice::<RefundRequest>(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?
    };
    debug!("💻️ POST refund of {order_id} by {}", claims.vendor_id);
    let result = api.refund(order_id, claims.vendor_id, request.amount).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Vendors  ----------------------------------------------------
route!(connect_vendor => Post "/vendor/connect" impl MarketplaceDatabase, PaymentGateway);
/// Creates the vendor's connected account (once) and opens an onboarding session for it.
pub async fn connect_vendor<B, G>(
    claims: VendorClaims,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    debug!("💻️ POST connect for {}", claims.vendor_id);
    let session = api.connect_vendor(claims.vendor_id).await?;
    Ok(HttpResponse::Ok().json(session))
}

//----------------------------------------------   Products  ----------------------------------------------------
route!(create_product => Post "/product" impl MarketplaceDatabase, PaymentGateway);
pub async fn create_product<B, G>(
    claims: VendorClaims,
    body: web::Json<NewProduct>,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    debug!("💻️ POST product for {}", claims.vendor_id);
    let product = api.create_product(claims.vendor_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(add_variation => Post "/product/{id}/variation" impl MarketplaceDatabase, PaymentGateway);
/// Adds a variation to one of the vendor's products. Vendors that cannot take payments yet can only list items.
pub async fn add_variation<B, G>(
    claims: VendorClaims,
    path: web::Path<ProductId>,
    body: web::Json<NewVariation>,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let product_id = path.into_inner();
    debug!("💻️ POST variation for {product_id} by {}", claims.vendor_id);
    let variation = api.add_variation(claims.vendor_id, product_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(variation))
}

route!(product => Get "/product/{id}" impl MarketplaceDatabase, PaymentGateway);
pub async fn product<B, G>(
    path: web::Path<ProductId>,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let product_id = path.into_inner();
    trace!("💻️ GET {product_id}");
    let product = api.product(product_id).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(update_product => Put "/product/{id}" impl MarketplaceDatabase, PaymentGateway);
pub async fn update_product<B, G>(
    claims: VendorClaims,
    path: web::Path<ProductId>,
    body: web::Json<ProductUpdate>,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let product_id = path.into_inner();
    debug!("💻️ PUT {product_id} by {}", claims.vendor_id);
    let product = api.update_product(claims.vendor_id, product_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(archive_product => Delete "/product/{id}" impl MarketplaceDatabase, PaymentGateway);
/// Archives the product. It disappears from the catalog, but orders that contain it are unaffected.
pub async fn archive_product<B, G>(
    claims: VendorClaims,
    path: web::Path<ProductId>,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let product_id = path.into_inner();
    debug!("💻️ DELETE {product_id} by {}", claims.vendor_id);
    api.archive_product(claims.vendor_id, product_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

route!(own_products => Get "/product/vendor" impl MarketplaceDatabase, PaymentGateway);
/// The logged-in vendor's products, including inactive ones. Archived products are left out.
pub async fn own_products<B, G>(
    claims: VendorClaims,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    trace!("💻️ GET products of {}", claims.vendor_id);
    let products = api.own_products(claims.vendor_id).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(vendor_catalog => Get "/product/vendor/{vendor_id}" impl MarketplaceDatabase, PaymentGateway);
pub async fn vendor_catalog<B, G>(
    path: web::Path<VendorId>,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let vendor_id = path.into_inner();
    trace!("💻️ GET catalog of {vendor_id}");
    let catalog = api.vendor_catalog(vendor_id).await?;
    Ok(HttpResponse::Ok().json(catalog))
}

route!(update_variation => Put "/variation/{id}" impl MarketplaceDatabase, PaymentGateway);
pub async fn update_variation<B, G>(
    claims: VendorClaims,
    path: web::Path<VariationId>,
    body: web::Json<VariationUpdate>,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let variation_id = path.into_inner();
    debug!("💻️ PUT {variation_id} by {}", claims.vendor_id);
    let variation = api.update_variation(claims.vendor_id, variation_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(variation))
}

route!(archive_variation => Delete "/variation/{id}" impl MarketplaceDatabase, PaymentGateway);
pub async fn archive_variation<B, G>(
    claims: VendorClaims,
    path: web::Path<VariationId>,
    api: web::Data<InventoryApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let variation_id = path.into_inner();
    debug!("💻️ DELETE {variation_id} by {}", claims.vendor_id);
    api.archive_variation(claims.vendor_id, variation_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}
