use actix_web::{http::StatusCode, test::TestRequest, web};
use market_engine::{
    db_types::{OrderStatusType, PaymentEventKind},
    events::EventProducers,
    traits::{GatewayError, GatewayEvent, PaymentEvent},
    ReconciliationApi,
    SqliteDatabase,
};
use stripe_tools::webhook::SIGNATURE_HEADER;

use super::{
    helpers::{call, TestMarket},
    mocks::MockGateway,
};
use crate::server::register_routes;

const PAYLOAD: &str = r#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
const SIGNATURE: &str = "t=1700000000,v1=abcdef";

fn webhook_app(market: &TestMarket, gateway: MockGateway) -> impl FnOnce(&mut web::ServiceConfig) {
    let api = ReconciliationApi::new(market.db.clone(), gateway, EventProducers::default());
    move |cfg| {
        cfg.app_data(web::Data::new(api)).configure(register_routes::<SqliteDatabase, MockGateway>);
    }
}

fn delivery() -> TestRequest {
    TestRequest::post().uri("/order/webhook").insert_header((SIGNATURE_HEADER, SIGNATURE)).set_payload(PAYLOAD)
}

fn gateway_returning(event: GatewayEvent) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway
        .expect_verify_webhook()
        .withf(|payload, signature| payload == PAYLOAD.as_bytes() && signature == SIGNATURE)
        .returning(move |_, _| Ok(event.clone()));
    gateway
}

fn payment(id: &str, intent: &str, kind: PaymentEventKind) -> GatewayEvent {
    GatewayEvent::Payment(PaymentEvent { id: id.into(), payment_intent: intent.into(), kind })
}

#[actix_web::test]
async fn delivery_without_signature() {
    let market = TestMarket::new().await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify_webhook().never();
    let req = TestRequest::post().uri("/order/webhook").set_payload(PAYLOAD);
    let (status, body) = call(req, webhook_app(&market, gateway)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
    market.teardown().await;
}

#[actix_web::test]
async fn delivery_with_bad_signature() {
    let market = TestMarket::new().await;
    let (checkout, _) = market.place_order(1).await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_verify_webhook()
        .times(1)
        .returning(|_, _| Err(GatewayError::SignatureInvalid("No matching signature".into())));
    let (status, body) = call(delivery(), webhook_app(&market, gateway)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
    let order = market.order(checkout.order_id).await;
    assert_eq!(order.status, OrderStatusType::Incomplete);
    assert!(order.paid_at.is_none());
    market.teardown().await;
}

#[actix_web::test]
async fn successful_payment_is_applied_once() {
    let market = TestMarket::new().await;
    let (checkout, intent) = market.place_order(1).await;
    let event = payment("evt_paid", &intent, PaymentEventKind::Succeeded);

    let (status, body) = call(delivery(), webhook_app(&market, gateway_returning(event.clone()))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["outcome"], "status_changed");
    assert_eq!(body["status"], "paid");
    assert_eq!(body["order_id"], checkout.order_id.value());
    let order = market.order(checkout.order_id).await;
    assert_eq!(order.status, OrderStatusType::Paid);
    let paid_at = order.paid_at.expect("paid_at should be set");

    let (status, body) = call(delivery(), webhook_app(&market, gateway_returning(event))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "duplicate");
    let order = market.order(checkout.order_id).await;
    assert_eq!(order.status, OrderStatusType::Paid);
    assert_eq!(order.paid_at, Some(paid_at));
    market.teardown().await;
}

#[actix_web::test]
async fn failed_payment_after_success_leaves_order_paid() {
    let market = TestMarket::new().await;
    let (checkout, intent) = market.place_order(1).await;
    market.pay("evt_paid", &intent).await;
    let event = payment("evt_failed", &intent, PaymentEventKind::Failed);
    let (status, body) = call(delivery(), webhook_app(&market, gateway_returning(event))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["outcome"], "unchanged");
    assert_eq!(body["status"], "paid");
    assert_eq!(market.order(checkout.order_id).await.status, OrderStatusType::Paid);
    market.teardown().await;
}

#[actix_web::test]
async fn payment_for_unknown_intent() {
    let market = TestMarket::new().await;
    let event = payment("evt_stray", "pi_nobody_knows", PaymentEventKind::Succeeded);
    let (status, body) = call(delivery(), webhook_app(&market, gateway_returning(event))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "order_not_found");
    market.teardown().await;
}

#[actix_web::test]
async fn account_update_activates_vendor() {
    let market = TestMarket::new().await;
    let event = GatewayEvent::AccountUpdated { account_id: "acct_test_vendor".into(), charges_enabled: false };
    let (status, body) = call(delivery(), webhook_app(&market, gateway_returning(event))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["outcome"], "account_updated");
    assert_eq!(body["active"], false);
    market.teardown().await;
}

#[actix_web::test]
async fn unhandled_events_are_acknowledged() {
    let market = TestMarket::new().await;
    let event = GatewayEvent::Unhandled { id: "evt_misc".into(), event_type: "charge.dispute.created".into() };
    let (status, body) = call(delivery(), webhook_app(&market, gateway_returning(event))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "ignored");
    market.teardown().await;
}
