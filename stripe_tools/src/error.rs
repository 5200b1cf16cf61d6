use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The response did not contain the expected field: {0}")]
    MissingField(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("The signature header is missing or malformed: {0}")]
    MalformedHeader(String),
    #[error("No signature in the header matches the expected signature")]
    SignatureMismatch,
    #[error("The webhook timestamp {timestamp} is outside the tolerance window")]
    TimestampOutOfTolerance { timestamp: i64 },
    #[error("Could not parse the webhook payload: {0}")]
    InvalidPayload(String),
}
