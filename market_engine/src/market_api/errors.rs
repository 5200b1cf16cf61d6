use thiserror::Error;

use crate::{
    db_types::{OrderStatusType, VendorId},
    helpers::ValidationError,
    traits::{GatewayError, InventoryError, MarketplaceError, NotificationError, OrderManagementError},
};

/// The errors the marketplace APIs report to their callers. The server maps each one onto an HTTP status.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("The requested {0} does not exist")]
    NotFound(String),
    #[error("You do not have access to this resource")]
    Forbidden,
    #[error("{0}")]
    InvalidPurchase(String),
    #[error("{0}")]
    InvalidAmount(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Cannot change the order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Invalid webhook signature. {0}")]
    SignatureInvalid(String),
    #[error("{0} cannot accept online payments yet")]
    VendorNotPayable(VendorId),
    #[error("Payment processor error. {0}")]
    GatewayError(String),
    #[error("Database error. {0}")]
    DatabaseError(String),
}

impl OrderFlowError {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn not_found<S: ToString>(what: S) -> Self {
        Self::NotFound(what.to_string())
    }
}

impl From<ValidationError> for OrderFlowError {
    fn from(e: ValidationError) -> Self {
        Self::ValidationError(e.0)
    }
}

impl From<InventoryError> for OrderFlowError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::DatabaseError(s) => Self::DatabaseError(s),
            InventoryError::VendorNotFound(id) => Self::not_found(id),
            InventoryError::ProductNotFound(id) => Self::not_found(id),
            InventoryError::VariationNotFound(id) => Self::not_found(id),
            e @ InventoryError::VendorAlreadyExists(_) => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<OrderManagementError> for OrderFlowError {
    fn from(e: OrderManagementError) -> Self {
        match e {
            OrderManagementError::DatabaseError(s) => Self::DatabaseError(s),
            OrderManagementError::QueryError(s) => Self::ValidationError(s),
        }
    }
}

impl From<MarketplaceError> for OrderFlowError {
    fn from(e: MarketplaceError) -> Self {
        match e {
            MarketplaceError::DatabaseError(s) => Self::DatabaseError(s),
            e @ MarketplaceError::InsufficientStock { .. } => Self::InvalidPurchase(e.to_string()),
            MarketplaceError::OrderNotFound(id) => Self::not_found(id),
            e @ MarketplaceError::OrderModificationNoOp => Self::ValidationError(e.to_string()),
            e @ MarketplaceError::RefundNotPending(_) => Self::DatabaseError(e.to_string()),
            MarketplaceError::InventoryError(e) => e.into(),
            MarketplaceError::OrderManagementError(e) => e.into(),
        }
    }
}

impl From<GatewayError> for OrderFlowError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::SignatureInvalid(s) => Self::SignatureInvalid(s),
            e => Self::GatewayError(e.to_string()),
        }
    }
}

impl From<NotificationError> for OrderFlowError {
    fn from(e: NotificationError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
