use actix_web::{http::StatusCode, test::TestRequest, web};
use market_engine::{
    db_types::{Cents, OrderId, RefundStatus},
    events::EventProducers,
    traits::{GatewayError, GatewayRefund},
    ReconciliationApi,
    SqliteDatabase,
};
use mockall::predicate::{always, eq};
use serde_json::json;

use super::{
    helpers::{as_vendor, call, TestMarket, VENDOR_ACCOUNT},
    mocks::MockGateway,
};
use crate::server::register_routes;

fn refund_app(market: &TestMarket, gateway: MockGateway) -> impl FnOnce(&mut web::ServiceConfig) {
    let api = ReconciliationApi::new(market.db.clone(), gateway, EventProducers::default());
    move |cfg| {
        cfg.app_data(web::Data::new(api)).configure(register_routes::<SqliteDatabase, MockGateway>);
    }
}

fn refund_uri(order_id: OrderId) -> String {
    format!("/order/{}/refund", order_id.value())
}

fn untouched_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_refund().never();
    gateway
}

#[actix_web::test]
async fn unpaid_orders_cannot_be_refunded() {
    let market = TestMarket::new().await;
    let (checkout, _) = market.place_order(1).await;
    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor);
    let (status, body) = call(req, refund_app(&market, untouched_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
    assert!(market.order(checkout.order_id).await.refunds.is_empty());
    market.teardown().await;
}

#[actix_web::test]
async fn partial_then_full_refund() {
    let market = TestMarket::new().await;
    let (checkout, intent) = market.place_order(2).await;
    market.pay("evt_paid", &intent).await;

    let mut gateway = MockGateway::new();
    let pi = intent.clone();
    gateway
        .expect_create_refund()
        .withf(move |account, payment_intent, amount, key| {
            account == VENDOR_ACCOUNT && payment_intent == pi && *amount == Cents::from(1500) && key.starts_with("refund-")
        })
        .times(1)
        .returning(|_, _, _, _| Ok(GatewayRefund { id: "re_1".into() }));
    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor)
        .set_json(json!({"amount": 1500}));
    let (status, body) = call(req, refund_app(&market, gateway)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["refund"]["amount"], 1500);
    assert_eq!(body["refund"]["external_refund_id"], "re_1");
    assert_eq!(body["refund"]["status"], "issued");
    assert_eq!(body["refunded"], 1500);
    assert_eq!(body["refundable"], 3500);

    // No amount refunds the remainder
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_refund()
        .with(eq(VENDOR_ACCOUNT), eq(intent.clone()), eq(Cents::from(3500)), always())
        .times(1)
        .returning(|_, _, _, _| Ok(GatewayRefund { id: "re_2".into() }));
    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor);
    let (status, body) = call(req, refund_app(&market, gateway)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["refunded"], 5000);
    assert_eq!(body["refundable"], 0);

    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor);
    let (status, _) = call(req, refund_app(&market, untouched_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(market.order(checkout.order_id).await.refunds.len(), 2);
    market.teardown().await;
}

#[actix_web::test]
async fn refund_larger_than_refundable() {
    let market = TestMarket::new().await;
    let (checkout, intent) = market.place_order(1).await;
    market.pay("evt_paid", &intent).await;
    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor)
        .set_json(json!({"amount": 2501}));
    let (status, body) = call(req, refund_app(&market, untouched_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
    market.teardown().await;
}

#[actix_web::test]
async fn malformed_refund_body() {
    let market = TestMarket::new().await;
    let (checkout, intent) = market.place_order(1).await;
    market.pay("evt_paid", &intent).await;
    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor)
        .insert_header(("content-type", "application/json"))
        .set_payload(r#"{"amount": "lots"}"#);
    let (status, body) = call(req, refund_app(&market, untouched_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
    assert!(market.order(checkout.order_id).await.refunds.is_empty());
    market.teardown().await;
}

#[actix_web::test]
async fn gateway_rejection_records_nothing() {
    let market = TestMarket::new().await;
    let (checkout, intent) = market.place_order(1).await;
    market.pay("evt_paid", &intent).await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_refund()
        .times(1)
        .returning(|_, _, _, _| Err(GatewayError::Rejected("charge already refunded".into())));
    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor);
    let (status, body) = call(req, refund_app(&market, gateway)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": {"code": 500, "message": "Internal server error"}}));
    assert!(market.order(checkout.order_id).await.refunds.is_empty());
    market.teardown().await;
}

#[actix_web::test]
async fn unreachable_gateway_keeps_the_refund_pending() {
    let market = TestMarket::new().await;
    let (checkout, intent) = market.place_order(1).await;
    market.pay("evt_paid", &intent).await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_refund()
        .times(1)
        .returning(|_, _, _, _| Err(GatewayError::Unavailable("connection reset".into())));
    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor);
    let (status, body) = call(req, refund_app(&market, gateway)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": {"code": 500, "message": "Internal server error"}}));
    let order = market.order(checkout.order_id).await;
    assert_eq!(order.refunds.len(), 1);
    assert_eq!(order.refunds[0].status, RefundStatus::Pending);
    assert_eq!(order.refundable(), Cents::from(0));

    // A second attempt is refused rather than sent with a fresh idempotency key
    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.vendor);
    let (status, body) = call(req, refund_app(&market, untouched_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(market.order(checkout.order_id).await.refunds.len(), 1);
    market.teardown().await;
}

#[actix_web::test]
async fn only_the_owner_can_refund() {
    let market = TestMarket::new().await;
    let (checkout, intent) = market.place_order(1).await;
    market.pay("evt_paid", &intent).await;

    let req = TestRequest::post().uri(&refund_uri(checkout.order_id));
    let (status, _) = call(req, refund_app(&market, untouched_gateway())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = as_vendor(TestRequest::post().uri(&refund_uri(checkout.order_id)), market.other_vendor);
    let (status, body) = call(req, refund_app(&market, untouched_gateway())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], 403);
    market.teardown().await;
}
