use actix_web::{
    http::{header::AUTHORIZATION, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use log::debug;
use market_common::Secret;
use market_engine::{
    db_types::{LineItem, NewProduct, Order, OrderId, PaymentEventKind, ProductId, PurchaseOption, VariationId, VendorId},
    events::EventProducers,
    order_objects::{CheckoutRequest, CheckoutResult},
    test_utils::{
        fixtures::{new_variation, new_vendor, sample_customer},
        prepare_env::{drop_database, prepare_test_env, random_db_path},
        FakeGateway,
    },
    traits::{InventoryManagement, OrderManagement, PaymentEvent},
    CheckoutApi,
    ReconciliationApi,
    SqliteDatabase,
};
use serde_json::Value;

use crate::{auth::TokenIssuer, config::AuthConfig, server::configure_extractors};

// The secret for the test token issuer. DO NOT re-use it anywhere.
const TEST_JWT_SECRET: &str = "endpoint-tests-only-hs256-secret-0123456789";

pub const VENDOR_ACCOUNT: &str = "acct_test_vendor";

pub fn token_issuer() -> TokenIssuer {
    TokenIssuer::new(&AuthConfig { jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()) })
}

pub fn vendor_token(vendor_id: VendorId) -> String {
    token_issuer().issue_token(vendor_id, None).expect("Failed to sign token")
}

/// Adds a vendor session for `vendor_id` to the request.
pub fn as_vendor(req: TestRequest, vendor_id: VendorId) -> TestRequest {
    req.insert_header((AUTHORIZATION, format!("Bearer {}", vendor_token(vendor_id))))
}

/// Runs a single request against an app built by `configure`, and returns the status and the JSON body (or the body
/// as a JSON string, if it isn't JSON).
pub async fn call<F>(req: TestRequest, configure: F) -> (StatusCode, Value)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(web::Data::new(token_issuer())).configure(configure_extractors).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let json = serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into()));
    (status, json)
}

/// A migrated database with two vendors. "Blue Pottery" can take payments and lists a blue mug ($20.00 + $5.00
/// shipping, 3 in stock). "Green Glass" has no connected account yet.
pub struct TestMarket {
    pub db_url: String,
    pub db: SqliteDatabase,
    pub gateway: FakeGateway,
    pub vendor: VendorId,
    pub other_vendor: VendorId,
    pub product: ProductId,
    pub variation: VariationId,
}

impl TestMarket {
    pub async fn new() -> Self {
        let db_url = random_db_path();
        let db = prepare_test_env(&db_url).await;
        let vendor = db.insert_vendor(new_vendor("Blue Pottery", "maria@bluepottery.example")).await.unwrap();
        db.set_connected_account(vendor.id, VENDOR_ACCOUNT).await.unwrap();
        db.set_connected_account_status(VENDOR_ACCOUNT, true).await.unwrap();
        let other = db.insert_vendor(new_vendor("Green Glass", "ines@greenglass.example")).await.unwrap();
        let product = NewProduct {
            name: "Mug".into(),
            description: "A hand-thrown mug".into(),
            tags: vec!["kitchen".into()],
            images: vec![],
            active: true,
            external_product_id: None,
        };
        let product = db.insert_product(vendor.id, product).await.unwrap();
        let variation =
            db.insert_variation(product.id, new_variation("Blue", 2000, 500, 3, PurchaseOption::Ship)).await.unwrap();
        Self {
            db_url,
            db,
            gateway: FakeGateway::new(),
            vendor: vendor.id,
            other_vendor: other.id,
            product: product.id,
            variation: variation.id,
        }
    }

    pub fn checkout_request(&self, quantity: i64) -> CheckoutRequest {
        CheckoutRequest {
            vendor: self.vendor,
            items: vec![LineItem { product: self.product, variation: self.variation, quantity }],
            customer: sample_customer(),
            confirm_email: None,
        }
    }

    /// Places an order through the engine directly, using the fake gateway. Returns the checkout result and the id of
    /// the payment intent.
    pub async fn place_order(&self, quantity: i64) -> (CheckoutResult, String) {
        let api = CheckoutApi::new(self.db.clone(), self.gateway.clone(), EventProducers::default());
        let result = api.create_order(self.checkout_request(quantity)).await.expect("Checkout failed");
        let intent = self.gateway.last_intent().expect("No payment intent was opened").id;
        (result, intent)
    }

    pub async fn pay(&self, event_id: &str, payment_intent: &str) {
        let api = ReconciliationApi::new(self.db.clone(), self.gateway.clone(), EventProducers::default());
        let event = PaymentEvent {
            id: event_id.into(),
            payment_intent: payment_intent.into(),
            kind: PaymentEventKind::Succeeded,
        };
        api.process_payment_event(event).await.expect("Payment event failed");
    }

    pub async fn order(&self, order_id: OrderId) -> Order {
        self.db.fetch_order(order_id).await.unwrap().expect("Order not found")
    }

    pub async fn teardown(self) {
        self.db.pool().close().await;
        drop_database(&self.db_url).await;
    }
}
