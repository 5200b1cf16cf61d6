use market_engine::{
    db_types::Cents,
    traits::{
        ConnectedAccount,
        GatewayError,
        GatewayEvent,
        GatewayRefund,
        OnboardingSession,
        PaymentGateway,
        PaymentIntent,
        VendorProfile,
    },
};
use mockall::mock;

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_payment_intent(&self, account: &str, amount: Cents, application_fee: Cents) -> Result<PaymentIntent, GatewayError>;
        async fn create_refund(&self, account: &str, payment_intent: &str, amount: Cents, idempotency_key: &str) -> Result<GatewayRefund, GatewayError>;
        fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError>;
        async fn create_connected_account(&self, profile: &VendorProfile) -> Result<ConnectedAccount, GatewayError>;
        async fn create_onboarding_session(&self, account: &str) -> Result<OnboardingSession, GatewayError>;
    }
}
