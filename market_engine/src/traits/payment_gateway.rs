use thiserror::Error;

use crate::{
    db_types::Cents,
    traits::data_objects::{
        ConnectedAccount,
        GatewayEvent,
        GatewayRefund,
        OnboardingSession,
        PaymentIntent,
        VendorProfile,
    },
};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The webhook signature could not be verified. {0}")]
    SignatureInvalid(String),
    #[error("The payment processor rejected the request. {0}")]
    Rejected(String),
    #[error("Could not communicate with the payment processor. {0}")]
    Unavailable(String),
}

/// The contract with the external payment processor.
///
/// Charges follow the "Connect" model: they are created on the vendor's connected account and the platform collects
/// an application fee.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Opens a payment intent for `amount` on the connected `account`, tagging the platform's `application_fee`.
    async fn create_payment_intent(
        &self,
        account: &str,
        amount: Cents,
        application_fee: Cents,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Refunds `amount` of the given payment intent. The refund is issued on the connected `account`.
    ///
    /// Repeating a request with the same `idempotency_key` must return the original refund instead of issuing a
    /// new one.
    async fn create_refund(
        &self,
        account: &str,
        payment_intent: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<GatewayRefund, GatewayError>;

    /// Checks the signature of a raw webhook body and returns the event it carries. This must fail closed: any doubt
    /// about the signature results in [`GatewayError::SignatureInvalid`].
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError>;

    async fn create_connected_account(&self, profile: &VendorProfile) -> Result<ConnectedAccount, GatewayError>;

    async fn create_onboarding_session(&self, account: &str) -> Result<OnboardingSession, GatewayError>;
}
