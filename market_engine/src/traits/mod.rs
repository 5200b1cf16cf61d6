//! #  Backend contracts.
//!
//! This module provides the interfaces that the marketplace engine's *backends* need to implement.
//!
//! ## Storage
//! * [`InventoryManagement`] manages vendors, their products and the products' variations (the inventory ledger).
//! * [`OrderManagement`] provides read-only queries over orders.
//! * [`MarketplaceDatabase`] defines the highest level of behaviour: atomically placing orders against the inventory,
//!   applying payment events exactly once, vendor status changes and refund records.
//! * [`NotificationOutbox`] stores notifications that could not be delivered, so that they can be retried later.
//!
//! ## External collaborators
//! * [`PaymentGateway`] abstracts the card payment processor.
//! * [`NotificationSender`] delivers e-mail notifications to vendors and customers.
mod data_objects;
mod inventory_management;
mod marketplace_database;
mod notifications;
mod order_management;
mod payment_gateway;

pub use data_objects::{
    ConnectedAccount,
    GatewayEvent,
    GatewayRefund,
    OnboardingSession,
    OrderChanged,
    PaymentEvent,
    PaymentEventResult,
    PaymentIntent,
    VendorProfile,
};
pub use inventory_management::{InventoryError, InventoryManagement};
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use notifications::{NotificationError, NotificationOutbox, NotificationSender};
pub use order_management::{OrderManagement, OrderManagementError};
pub use payment_gateway::{GatewayError, PaymentGateway};
