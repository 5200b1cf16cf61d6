use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub application_fee_amount: Option<i64>,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSession {
    pub account: String,
    pub client_secret: String,
    pub expires_at: i64,
}

/// A webhook delivery. The shape of `data.object` depends on `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: i64,
    /// Set when the event concerns a connected account rather than the platform account.
    #[serde(default)]
    pub account: Option<String>,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

impl StripeEvent {
    /// The id of the object the event is about, e.g. the payment intent id for `payment_intent.*` events.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object["id"].as_str()
    }

    pub fn object_bool(&self, field: &str) -> bool {
        self.data.object[field].as_bool().unwrap_or(false)
    }
}
