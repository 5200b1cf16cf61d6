//! Data types shared between the marketplace engine, its storage backends and its API consumers.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use market_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

macro_rules! id_type {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self).map_err(|_| ConversionError(format!("Invalid {} id: {s}", $label)))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} #{}", $label, self.0)
            }
        }
    };
}

id_type!(VendorId, "vendor");
id_type!(ProductId, "product");
id_type!(VariationId, "variation");
id_type!(OrderId, "order");

//--------------------------------------     AccessToken       ---------------------------------------------------------
/// Unguessable per-order token that lets a customer view their order without logging in.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------   PurchaseOption      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOption {
    /// The item is sold online and shipped to the customer
    Ship,
    /// The item is sold online and collected or delivered digitally
    Buy,
    /// The item is listed for display only and cannot be bought online
    List,
}

impl PurchaseOption {
    pub fn is_purchasable(&self) -> bool {
        match self {
            PurchaseOption::Ship | PurchaseOption::Buy => true,
            PurchaseOption::List => false,
        }
    }
}

impl Display for PurchaseOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurchaseOption::Ship => write!(f, "ship"),
            PurchaseOption::Buy => write!(f, "buy"),
            PurchaseOption::List => write!(f, "list"),
        }
    }
}

impl FromStr for PurchaseOption {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ship" => Ok(Self::Ship),
            "buy" => Ok(Self::Buy),
            "list" => Ok(Self::List),
            s => Err(ConversionError(format!("Invalid purchase option: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum OrderStatusType {
    /// The order has been created and a payment intent opened, but no payment has been confirmed yet.
    Incomplete,
    /// The payment processor confirmed the payment.
    Paid,
    /// The payment attempt failed or was cancelled. The customer may retry.
    PaymentFailed,
    /// The vendor declined the order. Terminal.
    Declined,
    /// The vendor acknowledged the order. Bookkeeping state only.
    Confirmed,
    /// The vendor shipped the order. Terminal.
    Shipped,
}

/// The kind of a payment event delivered by the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEventKind {
    Succeeded,
    Canceled,
    Failed,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 6] = [
        OrderStatusType::Incomplete,
        OrderStatusType::Paid,
        OrderStatusType::PaymentFailed,
        OrderStatusType::Declined,
        OrderStatusType::Confirmed,
        OrderStatusType::Shipped,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Declined | OrderStatusType::Shipped)
    }

    /// Statuses a vendor may move an order into.
    pub fn is_vendor_settable(&self) -> bool {
        matches!(self, OrderStatusType::Confirmed | OrderStatusType::Shipped | OrderStatusType::Declined)
    }

    /// The status an order moves to when a payment event arrives, or `None` if the event does not change it.
    ///
    /// | Current          | Succeeded | Canceled / Failed |
    /// |------------------|-----------|-------------------|
    /// | incomplete       | paid      | paymentFailed     |
    /// | paymentFailed    | paid      | -                 |
    /// | anything else    | -         | -                 |
    pub fn after_payment_event(&self, kind: PaymentEventKind) -> Option<OrderStatusType> {
        use OrderStatusType::*;
        match (self, kind) {
            (Incomplete | PaymentFailed, PaymentEventKind::Succeeded) => Some(Paid),
            (Incomplete, PaymentEventKind::Canceled | PaymentEventKind::Failed) => Some(PaymentFailed),
            _ => None,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Incomplete => "incomplete",
            OrderStatusType::Paid => "paid",
            OrderStatusType::PaymentFailed => "paymentFailed",
            OrderStatusType::Declined => "declined",
            OrderStatusType::Confirmed => "confirmed",
            OrderStatusType::Shipped => "shipped",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(Self::Incomplete),
            "paid" => Ok(Self::Paid),
            "paymentFailed" => Ok(Self::PaymentFailed),
            "declined" => Ok(Self::Declined),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Vendor         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Vendor {
    pub id: VendorId,
    pub store: String,
    pub owner: String,
    pub email: String,
    /// The vendor's sub-account with the payment processor
    pub connected_account_id: Option<String>,
    /// True once the processor reports that the connected account can accept charges
    pub connected_account_active: bool,
    pub notify_new_orders: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    pub fn can_sell_online(&self) -> bool {
        self.connected_account_id.is_some() && self.connected_account_active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVendor {
    pub store: String,
    pub owner: String,
    pub email: String,
    #[serde(default = "default_true")]
    pub notify_new_orders: bool,
}

fn default_true() -> bool {
    true
}

/// The part of a vendor record that is shown to customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorPublicInfo {
    pub id: VendorId,
    pub store: String,
    pub email: String,
}

impl From<&Vendor> for VendorPublicInfo {
    fn from(vendor: &Vendor) -> Self {
        Self { id: vendor.id, store: vendor.store.clone(), email: vendor.email.clone() }
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub description: String,
    pub tags: Json<Vec<String>>,
    pub images: Json<Vec<String>>,
    pub active: bool,
    pub archived: bool,
    /// The matching product in the payment processor's catalog, if one has been created
    pub external_product_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.active && !self.archived
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Inactive products stay visible to their vendor but cannot be bought or browsed
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub external_product_id: Option<String>,
}

/// A partial update of a product. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub active: Option<bool>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() &&
            self.description.is_none() &&
            self.tags.is_none() &&
            self.images.is_none() &&
            self.active.is_none()
    }
}

//--------------------------------------       Variation       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Variation {
    pub id: VariationId,
    pub product_id: ProductId,
    pub descriptor: String,
    pub price: Cents,
    pub shipping: Cents,
    pub quantity: i64,
    pub purchase_option: PurchaseOption,
    pub archived: bool,
    pub external_price_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVariation {
    pub descriptor: String,
    pub price: Cents,
    pub shipping: Cents,
    pub quantity: i64,
    pub purchase_option: PurchaseOption,
    #[serde(default)]
    pub external_price_id: Option<String>,
}

/// A partial update of a variation. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariationUpdate {
    pub descriptor: Option<String>,
    pub price: Option<Cents>,
    pub shipping: Option<Cents>,
    pub quantity: Option<i64>,
    pub purchase_option: Option<PurchaseOption>,
}

impl VariationUpdate {
    pub fn is_empty(&self) -> bool {
        self.descriptor.is_none() &&
            self.price.is_none() &&
            self.shipping.is_none() &&
            self.quantity.is_none() &&
            self.purchase_option.is_none()
    }

    /// The variation as it would look after the update is applied.
    pub fn apply_to(&self, current: &Variation) -> NewVariation {
        NewVariation {
            descriptor: self.descriptor.clone().unwrap_or_else(|| current.descriptor.clone()),
            price: self.price.unwrap_or(current.price),
            shipping: self.shipping.unwrap_or(current.shipping),
            quantity: self.quantity.unwrap_or(current.quantity),
            purchase_option: self.purchase_option.unwrap_or(current.purchase_option),
            external_price_id: current.external_price_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductWithVariations {
    #[serde(flatten)]
    pub product: Product,
    pub variations: Vec<Variation>,
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
/// A line item as requested by a customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductId,
    pub variation: VariationId,
    pub quantity: i64,
}

/// A line item snapshotted into an order at creation time. Later catalog edits never change it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variation_id: VariationId,
    pub product_name: String,
    pub descriptor: String,
    pub unit_price: Cents,
    pub unit_shipping: Cents,
    pub quantity: i64,
}

//--------------------------------------     CustomerInfo      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub address: String,
    pub email: String,
}

//--------------------------------------        Refund         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    /// The amount is reserved against the order while the processor is asked to issue the refund
    Pending,
    /// The processor issued the refund
    Issued,
}

/// A refund against an order. Pending refunds count towards [`Order::refunded`] so that concurrent requests can
/// never refund more than the order total between them.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Refund {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Cents,
    pub status: RefundStatus,
    pub external_refund_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Refund {
    /// The key sent to the payment processor so that retrying the same refund never issues it twice.
    pub fn idempotency_key(&self) -> String {
        format!("refund-{}-{}", self.order_id.value(), self.id)
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub vendor_id: VendorId,
    pub order_number: String,
    #[serde(skip_serializing)]
    pub access_token: AccessToken,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub sub_total: Cents,
    pub shipping: Cents,
    pub total: Cents,
    pub status: OrderStatusType,
    pub vendor_note: Option<String>,
    pub payment_intent: String,
    /// Set the first time the processor confirms a payment for this order
    pub paid_at: Option<DateTime<Utc>>,
    pub refunds: Vec<Refund>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn refunded(&self) -> Cents {
        self.refunds.iter().map(|r| r.amount).sum()
    }

    /// `total` minus everything refunded so far. Based only on the order's own stored totals.
    pub fn refundable(&self) -> Cents {
        self.total - self.refunded()
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub vendor_id: VendorId,
    pub order_number: String,
    pub access_token: AccessToken,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub sub_total: Cents,
    pub shipping: Cents,
    pub total: Cents,
    pub payment_intent: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  FailedNotification   ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct FailedNotification {
    pub id: i64,
    pub payload: String,
    pub last_error: String,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
}
