//! Order totals.
//!
//! All arithmetic is done on integer minor currency units. The same function is used wherever totals are needed, so
//! repeated calculations over the same items always agree exactly.
use serde::Serialize;
use thiserror::Error;

use crate::db_types::{Cents, OrderItem, Variation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLine {
    pub price: Cents,
    pub shipping: Cents,
    pub quantity: i64,
}

impl PriceLine {
    pub fn new(price: Cents, shipping: Cents, quantity: i64) -> Self {
        Self { price, shipping, quantity }
    }

    pub fn for_variation(variation: &Variation, quantity: i64) -> Self {
        Self::new(variation.price, variation.shipping, quantity)
    }
}

impl From<&OrderItem> for PriceLine {
    fn from(item: &OrderItem) -> Self {
        Self::new(item.unit_price, item.unit_shipping, item.quantity)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub sub_total: Cents,
    pub shipping: Cents,
}

impl Totals {
    pub fn total(&self) -> Cents {
        self.sub_total + self.shipping
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("The order total is too large")]
    Overflow,
}

/// `sub_total = Σ price × quantity` and `shipping = Σ shipping × quantity`.
pub fn calculate_totals<I>(lines: I) -> Result<Totals, PricingError>
where I: IntoIterator<Item = PriceLine> {
    lines.into_iter().try_fold(Totals::default(), |acc, line| {
        let sub_total = line.price.checked_mul(line.quantity).and_then(|v| acc.sub_total.checked_add(v));
        let shipping = line.shipping.checked_mul(line.quantity).and_then(|v| acc.shipping.checked_add(v));
        match (sub_total, shipping) {
            (Some(sub_total), Some(shipping)) if sub_total.checked_add(shipping).is_some() => {
                Ok(Totals { sub_total, shipping })
            },
            _ => Err(PricingError::Overflow),
        }
    })
}
