//! Marketplace Engine
//!
//! The marketplace engine is the core of a multi-tenant marketplace: vendors list products with variations,
//! customers check out, and payments are taken through a "Connect"-style payment processor, where the funds go to the
//! vendor's connected account and the platform collects a fee. The library is provider-agnostic. The payment
//! processor and the e-mail service are reached through the [`traits::PaymentGateway`] and
//! [`traits::NotificationSender`] traits.
//!
//! The library is divided into the following sections:
//! 1. Storage ([`traits`] and the SQLite backend). You should never need to access the database directly. Use the
//!    public APIs instead. The data types stored in the database are public, and live in [`db_types`].
//! 2. The public APIs ([`mod@market_api`]): checkout, reconciliation of webhooks, refunds and vendor status updates,
//!    order queries, inventory management and notifications.
//!
//! The engine also emits events when orders are created or change status (see [`events`]). A simple actor framework
//! lets you hook into these events, which is how notifications are sent.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod market_api;
pub mod notifications;
pub mod pricing;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use market_api::{
    checkout_api::{CheckoutApi, DEFAULT_PLATFORM_FEE_PERCENT},
    errors::OrderFlowError,
    inventory_api::InventoryApi,
    notification_api::{NotificationApi, RetryReport},
    order_objects,
    order_query_api::OrderQueryApi,
    reconciliation_api::ReconciliationApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
