use log::*;
use market_common::{Secret, DEFAULT_CURRENCY_CODE};

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_WEBHOOK_TOLERANCE: i64 = 300;

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    /// Maximum age, in seconds, of a webhook signature timestamp.
    pub webhook_tolerance: i64,
    pub currency: String,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("MKT_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string());
        let secret_key = Secret::new(std::env::var("MKT_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("MKT_STRIPE_SECRET_KEY not set, using (probably useless) default");
            "sk_test_000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("MKT_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("MKT_STRIPE_WEBHOOK_SECRET not set, using (probably useless) default");
            "whsec_000000000000".to_string()
        }));
        let webhook_tolerance = std::env::var("MKT_STRIPE_WEBHOOK_TOLERANCE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("Invalid MKT_STRIPE_WEBHOOK_TOLERANCE value ({s}): {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE);
        let currency = std::env::var("MKT_STRIPE_CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY_CODE.to_string());
        Self { api_base, secret_key, webhook_secret, webhook_tolerance, currency }
    }
}
