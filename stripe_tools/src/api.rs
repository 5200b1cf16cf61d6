use std::sync::Arc;

use chrono::Utc;
use log::*;
use market_common::Cents;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::StripeConfig,
    webhook::construct_event,
    Account,
    AccountSession,
    PaymentIntent,
    Refund,
    StripeApiError,
    StripeEvent,
    WebhookError,
};

const CONNECTED_ACCOUNT_HEADER: &str = "Stripe-Account";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base.trim_end_matches('/'))
    }

    /// Sends a form-encoded request. `account` routes the call to a connected account.
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        account: Option<&str>,
        params: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method.clone(), url);
        if let Some(account) = account {
            req = req.header(CONNECTED_ACCOUNT_HEADER, account);
        }
        if let Some(key) = idempotency_key {
            req = req.header(IDEMPOTENCY_HEADER, key);
        }
        if !params.is_empty() {
            req = if method == Method::GET { req.query(params) } else { req.form(params) };
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message: error_message(&body) })
        }
    }

    /// Creates a payment intent directly on the vendor's connected account, with the platform's application fee.
    pub async fn create_payment_intent(
        &self,
        account: &str,
        amount: Cents,
        application_fee: Cents,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentIntent, StripeApiError> {
        debug!("💳️ Creating payment intent for {amount} on {account}");
        let params = [
            ("amount", amount.value().to_string()),
            ("currency", self.config.currency.clone()),
            ("application_fee_amount", application_fee.value().to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        let intent =
            self.rest_query::<PaymentIntent>(Method::POST, "/payment_intents", Some(account), &params, idempotency_key)
                .await?;
        if intent.client_secret.is_none() {
            return Err(StripeApiError::MissingField("client_secret".into()));
        }
        info!("💳️ Created payment intent {} for {amount} on {account}", intent.id);
        Ok(intent)
    }

    pub async fn create_refund(
        &self,
        account: &str,
        payment_intent: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<Refund, StripeApiError> {
        debug!("💳️ Refunding {amount} of {payment_intent} on {account} ({idempotency_key})");
        let params = [("payment_intent", payment_intent.to_string()), ("amount", amount.value().to_string())];
        let refund =
            self.rest_query::<Refund>(Method::POST, "/refunds", Some(account), &params, Some(idempotency_key)).await?;
        info!("💳️ Refund {} of {amount} created for {payment_intent}", refund.id);
        Ok(refund)
    }

    pub async fn create_account(&self, email: &str, business_name: &str) -> Result<Account, StripeApiError> {
        debug!("💳️ Creating connected account for {email}");
        let params = [
            ("type", "express".to_string()),
            ("email", email.to_string()),
            ("business_profile[name]", business_name.to_string()),
            ("capabilities[card_payments][requested]", "true".to_string()),
            ("capabilities[transfers][requested]", "true".to_string()),
        ];
        let account = self.rest_query::<Account>(Method::POST, "/accounts", None, &params, None).await?;
        info!("💳️ Created connected account {}", account.id);
        Ok(account)
    }

    pub async fn fetch_account(&self, account: &str) -> Result<Account, StripeApiError> {
        let path = format!("/accounts/{account}");
        self.rest_query::<Account>(Method::GET, &path, None, &[], None).await
    }

    pub async fn create_account_session(&self, account: &str) -> Result<AccountSession, StripeApiError> {
        debug!("💳️ Creating onboarding session for {account}");
        let params = [
            ("account", account.to_string()),
            ("components[account_onboarding][enabled]", "true".to_string()),
        ];
        self.rest_query::<AccountSession>(Method::POST, "/account_sessions", None, &params, None).await
    }

    /// Verifies a webhook delivery against the configured signing secret and returns the parsed event.
    pub fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<StripeEvent, WebhookError> {
        construct_event(
            payload,
            signature,
            self.config.webhook_secret.reveal(),
            self.config.webhook_tolerance,
            Utc::now().timestamp(),
        )
    }
}

fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }
    serde_json::from_str::<ErrorBody>(body).map(|b| b.error.message).unwrap_or_else(|_| body.to_string())
}
