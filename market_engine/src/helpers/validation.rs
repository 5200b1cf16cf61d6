use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::db_types::{CustomerInfo, LineItem, NewVariation, OrderStatusType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new<S: Into<String>>(msg: S) -> Self {
        Self(msg.into())
    }
}

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .unwrap()
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Checks the customer details of a checkout request. If `confirm_email` is given, it must match `email`.
pub fn validate_customer(customer: &CustomerInfo, confirm_email: Option<&str>) -> Result<(), ValidationError> {
    if customer.name.trim().is_empty() {
        return Err(ValidationError::new("Invalid name"));
    }
    if customer.address.trim().is_empty() {
        return Err(ValidationError::new("Invalid address"));
    }
    if !is_valid_email(&customer.email) {
        return Err(ValidationError::new("Invalid email"));
    }
    match confirm_email {
        Some(confirm) if confirm != customer.email => Err(ValidationError::new("Email address mismatch")),
        _ => Ok(()),
    }
}

pub fn validate_line_items(items: &[LineItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::new("The cart is empty"));
    }
    match items.iter().find(|item| item.quantity < 1) {
        Some(item) => Err(ValidationError(format!("Invalid quantity {} for {}", item.quantity, item.variation))),
        None => Ok(()),
    }
}

pub fn validate_new_variation(variation: &NewVariation) -> Result<(), ValidationError> {
    if variation.descriptor.trim().is_empty() {
        return Err(ValidationError::new("Variation descriptor is required"));
    }
    if variation.price.value() < 0 {
        return Err(ValidationError::new("Invalid price"));
    }
    if variation.shipping.value() < 0 {
        return Err(ValidationError::new("Invalid shipping"));
    }
    if variation.quantity < 0 {
        return Err(ValidationError::new("Invalid quantity"));
    }
    Ok(())
}

/// A vendor must say why they decline an order.
pub fn validate_vendor_note(status: OrderStatusType, note: Option<&str>) -> Result<(), ValidationError> {
    let has_note = note.map(|n| !n.trim().is_empty()).unwrap_or(false);
    if status == OrderStatusType::Declined && !has_note {
        return Err(ValidationError::new("Vendor note required"));
    }
    Ok(())
}

/// Parses a comma separated list of statuses, e.g. `paid,shipped`.
pub fn parse_status_list(value: &str) -> Result<Vec<OrderStatusType>, ValidationError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<OrderStatusType>().map_err(|_| ValidationError(format!("Invalid status '{s}'"))))
        .collect()
}
