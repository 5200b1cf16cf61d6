use std::time::Duration;

use cucumber::{then, when};
use market_engine::{
    db_types::{Cents, CustomerInfo, LineItem, OrderStatusType},
    helpers::parse_status_list,
    notifications::NotificationKind,
    order_objects::{CheckoutRequest, OrderQueryFilter, WebhookOutcome},
    test_utils::{FakeGateway, FAKE_WEBHOOK_SIGNATURE},
    traits::{InventoryManagement, OrderManagement},
    OrderFlowError,
};
use regex::Regex;

use crate::cucumber::{setups::vendor_email, MarketWorld};

fn customer(name: &str) -> CustomerInfo {
    CustomerInfo {
        name: name.to_string(),
        address: format!("{name}'s house, 1 Main Road"),
        email: customer_email(name),
    }
}

fn customer_email(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase())
}

fn error_name(e: &OrderFlowError) -> &'static str {
    match e {
        OrderFlowError::NotFound(_) => "NotFound",
        OrderFlowError::Forbidden => "Forbidden",
        OrderFlowError::InvalidPurchase(_) => "InvalidPurchase",
        OrderFlowError::InvalidAmount(_) => "InvalidAmount",
        OrderFlowError::ValidationError(_) => "ValidationError",
        OrderFlowError::InvalidStatusTransition { .. } => "InvalidStatusTransition",
        OrderFlowError::SignatureInvalid(_) => "SignatureInvalid",
        OrderFlowError::VendorNotPayable(_) => "VendorNotPayable",
        OrderFlowError::GatewayError(_) => "GatewayError",
        OrderFlowError::DatabaseError(_) => "DatabaseError",
    }
}

fn outcome_name(o: &WebhookOutcome) -> &'static str {
    match o {
        WebhookOutcome::StatusChanged { .. } => "StatusChanged",
        WebhookOutcome::Unchanged { .. } => "Unchanged",
        WebhookOutcome::Duplicate => "Duplicate",
        WebhookOutcome::OrderNotFound => "OrderNotFound",
        WebhookOutcome::AccountUpdated { .. } => "AccountUpdated",
        WebhookOutcome::Ignored => "Ignored",
    }
}

fn notification_kind(kind: &str) -> NotificationKind {
    serde_json::from_value(serde_json::Value::String(kind.to_string()))
        .unwrap_or_else(|_| panic!("Unknown notification kind {kind}"))
}

async fn checkout(world: &mut MarketWorld, name: &str, store: &str, lines: Vec<(i64, String)>, confirm: Option<String>) {
    let items = lines
        .into_iter()
        .map(|(quantity, key)| {
            let (product, variation) = world.variation(&key);
            LineItem { product, variation, quantity }
        })
        .collect();
    let request =
        CheckoutRequest { vendor: world.vendor_id(store), items, customer: customer(name), confirm_email: confirm };
    let result = world.system().checkout.create_order(request).await;
    if let Some(order) = world.record(result) {
        world.orders.insert(name.to_string(), order);
    }
}

//--------------------------------------         When          ---------------------------------------------------------

#[when(expr = "{word} buys {int} of {string} from {string}")]
async fn buys(world: &mut MarketWorld, name: String, qty: i64, key: String, store: String) {
    checkout(world, &name, &store, vec![(qty, key)], None).await;
}

#[when(expr = "{word} buys {int} of {string} and {int} of {string} from {string}")]
async fn buys_two_lines(world: &mut MarketWorld, name: String, q1: i64, k1: String, q2: i64, k2: String, store: String) {
    checkout(world, &name, &store, vec![(q1, k1), (q2, k2)], None).await;
}

#[when(expr = "{word} buys {int} of {string} from {string} confirming the email {string}")]
async fn buys_confirming(world: &mut MarketWorld, name: String, qty: i64, key: String, store: String, email: String) {
    checkout(world, &name, &store, vec![(qty, key)], Some(email)).await;
}

async fn send_webhook(world: &mut MarketWorld, payload: Vec<u8>, signature: &str) {
    let result = world.system().reconciliation.handle_webhook(&payload, signature).await;
    world.last_outcome = world.record(result);
}

#[when(expr = "the processor sends event {string} of type {string} for {word}'s order")]
async fn payment_webhook(world: &mut MarketWorld, event_id: String, event_type: String, name: String) {
    let order_id = world.order(&name).order_id;
    let order = world.system().db.fetch_order(order_id).await.unwrap().expect("Order not found");
    let payload = FakeGateway::payment_webhook(&event_id, &event_type, &order.payment_intent);
    send_webhook(world, payload, FAKE_WEBHOOK_SIGNATURE).await;
}

#[when(expr = "the processor sends event {string} of type {string} for payment intent {string}")]
async fn payment_webhook_for_intent(world: &mut MarketWorld, event_id: String, event_type: String, intent: String) {
    let payload = FakeGateway::payment_webhook(&event_id, &event_type, &intent);
    send_webhook(world, payload, FAKE_WEBHOOK_SIGNATURE).await;
}

#[when(expr = "the processor sends event {string} for {word}'s order with a forged signature")]
async fn forged_webhook(world: &mut MarketWorld, event_id: String, name: String) {
    let order_id = world.order(&name).order_id;
    let order = world.system().db.fetch_order(order_id).await.unwrap().expect("Order not found");
    let payload = FakeGateway::payment_webhook(&event_id, "payment_intent.succeeded", &order.payment_intent);
    send_webhook(world, payload, "t=0,v1=forged").await;
}

#[when(expr = "the processor reports that the payment account of {string} can accept charges")]
async fn account_activated(world: &mut MarketWorld, store: String) {
    let vendor_id = world.vendor_id(&store);
    let vendor = world.system().db.fetch_vendor(vendor_id).await.unwrap().expect("Vendor not found");
    let account = vendor.connected_account_id.expect("Vendor has no payment account");
    let payload = FakeGateway::account_webhook("evt_account", &account, true);
    send_webhook(world, payload, FAKE_WEBHOOK_SIGNATURE).await;
}

#[when(expr = "{string} connects a payment account")]
async fn connect(world: &mut MarketWorld, store: String) {
    let vendor_id = world.vendor_id(&store);
    let result = world.system().inventory.connect_vendor(vendor_id).await;
    world.record(result);
}

async fn update_status(world: &mut MarketWorld, store: &str, name: &str, status: &str, note: Option<String>) {
    let status = status.parse::<OrderStatusType>().expect("Invalid status");
    let order_id = world.order(name).order_id;
    let vendor_id = world.vendor_id(store);
    let result = world.system().reconciliation.update_status(order_id, vendor_id, status, note).await;
    world.record(result);
}

#[when(expr = "{string} marks {word}'s order as {word}")]
async fn mark_order(world: &mut MarketWorld, store: String, name: String, status: String) {
    update_status(world, &store, &name, &status, None).await;
}

#[when(expr = "{string} marks {word}'s order as {word} with the note {string}")]
async fn mark_order_with_note(world: &mut MarketWorld, store: String, name: String, status: String, note: String) {
    update_status(world, &store, &name, &status, Some(note)).await;
}

#[when(expr = "{string} refunds {int} of {word}'s order")]
async fn refund(world: &mut MarketWorld, store: String, amount: i64, name: String) {
    let order_id = world.order(&name).order_id;
    let vendor_id = world.vendor_id(&store);
    let result = world.system().reconciliation.refund(order_id, vendor_id, Some(Cents::from(amount))).await;
    world.record(result);
}

#[when(expr = "{string} refunds the rest of {word}'s order")]
async fn refund_rest(world: &mut MarketWorld, store: String, name: String) {
    let order_id = world.order(&name).order_id;
    let vendor_id = world.vendor_id(&store);
    let result = world.system().reconciliation.refund(order_id, vendor_id, None).await;
    world.record(result);
}

#[when("the processor rejects refunds")]
async fn reject_refunds(world: &mut MarketWorld) {
    world.system().gateway.reject_refunds(true);
}

#[when("the mail server goes down")]
async fn mail_down(world: &mut MarketWorld) {
    world.system().notifier.set_failing(true);
}

#[when("the mail server comes back")]
async fn mail_up(world: &mut MarketWorld) {
    world.system().notifier.set_failing(false);
}

#[when(expr = "the undelivered notifications are retried with at most {int} attempts")]
async fn retry_notifications(world: &mut MarketWorld, max_attempts: i64) {
    world.system().notifications.retry_failed(max_attempts).await.expect("Error retrying notifications");
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut MarketWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

//--------------------------------------         Then          ---------------------------------------------------------

#[then("the operation succeeds")]
async fn operation_succeeds(world: &mut MarketWorld) {
    assert!(world.last_error.is_none(), "Expected success, got {:?}", world.last_error);
}

#[then(expr = "the operation fails with {word}")]
async fn operation_fails(world: &mut MarketWorld, expected: String) {
    let err = world.last_error.as_ref().expect("Expected the operation to fail");
    assert_eq!(error_name(err), expected, "Unexpected error: {err}");
}

#[then(expr = "the error message mentions {string}")]
async fn error_mentions(world: &mut MarketWorld, text: String) {
    let err = world.last_error.as_ref().expect("Expected the operation to fail");
    assert!(err.to_string().contains(&text), "'{err}' does not mention '{text}'");
}

#[then(expr = "the webhook outcome is {word}")]
async fn webhook_outcome(world: &mut MarketWorld, expected: String) {
    assert!(world.last_error.is_none(), "Webhook failed: {:?}", world.last_error);
    let outcome = world.last_outcome.as_ref().expect("No webhook outcome");
    assert_eq!(outcome_name(outcome), expected);
}

#[then(expr = "{word}'s order has a sub-total of {int}, shipping of {int} and a total of {int}")]
async fn order_totals(world: &mut MarketWorld, name: String, sub_total: i64, shipping: i64, total: i64) {
    let order_id = world.order(&name).order_id;
    let order = world.system().db.fetch_order(order_id).await.unwrap().expect("Order not found");
    assert_eq!(order.sub_total, Cents::from(sub_total));
    assert_eq!(order.shipping, Cents::from(shipping));
    assert_eq!(order.total, Cents::from(total));
}

#[then(expr = "{word}'s order has status {word}")]
async fn order_status(world: &mut MarketWorld, name: String, status: String) {
    let order_id = world.order(&name).order_id;
    let order = world.system().db.fetch_order(order_id).await.unwrap().expect("Order not found");
    assert_eq!(order.status.to_string(), status);
}

#[then(expr = "{word}'s order number has the form YYMMDDHHmm-NNNN")]
async fn order_number_format(world: &mut MarketWorld, name: String) {
    let re = Regex::new(r"^\d{10}-\d{4}$").unwrap();
    let number = &world.order(&name).order_number;
    assert!(re.is_match(number), "Unexpected order number {number}");
}

#[then(expr = "the payment intent for {word}'s order is for {int} with a fee of {int} on the account of {string}")]
async fn payment_intent(world: &mut MarketWorld, name: String, amount: i64, fee: i64, store: String) {
    let order = world.order(&name).clone();
    let vendor = world.system().db.fetch_vendor(world.vendor_id(&store)).await.unwrap().expect("Vendor not found");
    let intent = world.system().gateway.last_intent().expect("No payment intent was opened");
    assert_eq!(intent.amount, Cents::from(amount));
    assert_eq!(intent.application_fee, Cents::from(fee));
    assert_eq!(Some(intent.account.clone()), vendor.connected_account_id);
    assert_eq!(order.connected_account, intent.account);
    assert_eq!(order.client_secret, format!("{}_secret", intent.id));
}

#[then(expr = "{string} has {int} in stock")]
async fn stock(world: &mut MarketWorld, key: String, expected: i64) {
    let (_, variation) = world.variation(&key);
    let variation = world.system().db.fetch_variation(variation).await.unwrap().expect("Variation not found");
    assert_eq!(variation.quantity, expected);
}

#[then(expr = "{string} is listed only")]
async fn listed_only(world: &mut MarketWorld, key: String) {
    let (_, variation) = world.variation(&key);
    let variation = world.system().db.fetch_variation(variation).await.unwrap().expect("Variation not found");
    assert!(!variation.purchase_option.is_purchasable());
}

#[then(expr = "no payment intent was opened")]
async fn no_intent(world: &mut MarketWorld) {
    assert!(world.system().gateway.intents().is_empty());
}

#[then(expr = "{word} has no order")]
async fn no_order(world: &mut MarketWorld, name: String) {
    assert!(!world.orders.contains_key(&name));
}

#[then(expr = "the customer {word} received {int} {string} notification(s)")]
async fn customer_notifications(world: &mut MarketWorld, name: String, count: usize, kind: String) {
    let sent = world.notifications_for(&customer_email(&name), notification_kind(&kind), count).await;
    assert_eq!(sent.len(), count, "Unexpected notifications: {sent:?}");
}

#[then(expr = "the vendor {string} received {int} {string} notification(s)")]
async fn vendor_notifications(world: &mut MarketWorld, store: String, count: usize, kind: String) {
    let sent = world.notifications_for(&vendor_email(&store), notification_kind(&kind), count).await;
    assert_eq!(sent.len(), count, "Unexpected notifications: {sent:?}");
}

#[then(expr = "the {string} notification to {word} mentions {string}")]
async fn notification_mentions(world: &mut MarketWorld, kind: String, name: String, text: String) {
    let sent = world.notifications_for(&customer_email(&name), notification_kind(&kind), 1).await;
    let last = sent.last().expect("No notification was sent");
    assert!(last.body.contains(&text), "'{}' does not mention '{text}'", last.body);
}

#[then(expr = "{int} notification(s) are waiting to be retried")]
async fn pending_notifications(world: &mut MarketWorld, count: usize) {
    use market_engine::traits::NotificationOutbox;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let pending = world.system().db.fetch_failed_notifications(i64::MAX).await.expect("Error fetching notifications");
    let waiting = pending.iter().filter(|n| n.attempts < 5).count();
    assert_eq!(waiting, count);
}

#[then(expr = "{word}'s order has {int} refund(s) totalling {int}, with {int} left to refund")]
async fn refunds(world: &mut MarketWorld, name: String, count: usize, total: i64, left: i64) {
    let order_id = world.order(&name).order_id;
    let order = world.system().db.fetch_order(order_id).await.unwrap().expect("Order not found");
    assert_eq!(order.refunds.len(), count);
    assert_eq!(order.refunded(), Cents::from(total));
    assert_eq!(order.refundable(), Cents::from(left));
    assert_eq!(world.system().gateway.refunds().len(), count);
}

#[then(expr = "{word} can view the order with its access token")]
async fn view_with_token(world: &mut MarketWorld, name: String) {
    let order = world.order(&name).clone();
    let details = world
        .system()
        .query
        .order_by_token(order.order_id, order.access_token.as_str())
        .await
        .expect("Customer could not view the order");
    assert_eq!(details.order_number, order.order_number);
    let json = serde_json::to_string(&details).unwrap();
    assert!(!json.contains(order.access_token.as_str()), "The access token leaked into the order details");
}

#[then(expr = "{word} cannot view the order with the token {string}")]
async fn view_with_bad_token(world: &mut MarketWorld, name: String, token: String) {
    let order_id = world.order(&name).order_id;
    let result = world.system().query.order_by_token(order_id, &token).await;
    assert!(matches!(result, Err(OrderFlowError::Forbidden)), "Expected Forbidden, got {result:?}");
}

#[then(expr = "{string} can view {word}'s order")]
async fn vendor_views(world: &mut MarketWorld, store: String, name: String) {
    let order_id = world.order(&name).order_id;
    let vendor_id = world.vendor_id(&store);
    let details = world.system().query.order_for_vendor(order_id, vendor_id).await.expect("Vendor could not view");
    assert_eq!(details.vendor.id, vendor_id);
}

#[then(expr = "{string} cannot view {word}'s order")]
async fn vendor_cannot_view(world: &mut MarketWorld, store: String, name: String) {
    let order_id = world.order(&name).order_id;
    let vendor_id = world.vendor_id(&store);
    let result = world.system().query.order_for_vendor(order_id, vendor_id).await;
    assert!(matches!(result, Err(OrderFlowError::Forbidden)), "Expected Forbidden, got {result:?}");
}

#[then(expr = "searching the orders of {string} with status {string} finds {int} order(s)")]
async fn search_by_status(world: &mut MarketWorld, store: String, statuses: String, count: usize) {
    let vendor_id = world.vendor_id(&store);
    let statuses = parse_status_list(&statuses).expect("Invalid status list");
    let filter = OrderQueryFilter::default().with_statuses(statuses);
    let orders = world.system().query.search_orders(vendor_id, filter).await.expect("Error searching orders");
    assert_eq!(orders.len(), count, "Unexpected orders: {orders:?}");
}

#[then(expr = "the orders of {string} are listed newest first as {string}")]
async fn search_all(world: &mut MarketWorld, store: String, names: String) {
    let vendor_id = world.vendor_id(&store);
    let orders =
        world.system().query.search_orders(vendor_id, OrderQueryFilter::default()).await.expect("Error searching");
    let found = orders.iter().map(|o| o.customer_name.as_str()).collect::<Vec<_>>().join(",");
    assert_eq!(found, names);
}

#[then(expr = "{string} can accept payments")]
async fn vendor_active(world: &mut MarketWorld, store: String) {
    let vendor_id = world.vendor_id(&store);
    let vendor = world.system().db.fetch_vendor(vendor_id).await.unwrap().expect("Vendor not found");
    assert!(vendor.can_sell_online());
}

#[then(expr = "{string} has a payment account that cannot accept payments yet")]
async fn vendor_connected_inactive(world: &mut MarketWorld, store: String) {
    let vendor_id = world.vendor_id(&store);
    let vendor = world.system().db.fetch_vendor(vendor_id).await.unwrap().expect("Vendor not found");
    assert!(vendor.connected_account_id.is_some());
    assert!(!vendor.connected_account_active);
}
