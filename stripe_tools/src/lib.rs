//! Client for the card payment processor used by the marketplace.
//!
//! The processor follows the "Connect" model: every vendor owns a connected account, charges are created directly on
//! that account and the platform takes an application fee. This crate covers the handful of calls the marketplace
//! needs (payment intents, refunds, connected accounts and onboarding sessions) and the verification of signed
//! webhook deliveries.
mod api;
mod config;
mod data_objects;
mod error;
pub mod webhook;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{Account, AccountSession, EventData, PaymentIntent, Refund, StripeEvent};
pub use error::{StripeApiError, WebhookError};
