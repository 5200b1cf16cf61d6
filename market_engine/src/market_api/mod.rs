//! # Marketplace engine public API
//!
//! The `market_api` module exposes the programmatic API of the marketplace engine. Every API is created by supplying
//! a backend that implements the backend traits it needs, plus any external collaborators (the payment gateway, the
//! notification sender).
//!
//! * [`checkout_api`] turns a customer's cart into a payable order.
//! * [`reconciliation_api`] applies payment processor webhooks, vendor status changes and refunds to orders.
//! * [`order_query_api`] gives customers and vendors read access to orders.
//! * [`inventory_api`] manages vendors, their payment accounts and their catalog.
//! * [`notification_api`] renders and delivers e-mail notifications, and retries failed deliveries.
//!
//! ```rust,ignore
//! use market_engine::{OrderQueryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OrderQueryApi::new(db);
//! let order = api.order_by_token(order_id, &token).await?;
//! ```
pub mod checkout_api;
pub mod errors;
pub mod inventory_api;
pub mod notification_api;
pub mod order_objects;
pub mod order_query_api;
pub mod reconciliation_api;
