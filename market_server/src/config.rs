use std::env;

use log::*;
use market_common::{parse_boolean_flag, Secret};
use market_engine::DEFAULT_PLATFORM_FEE_PERCENT;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use stripe_tools::StripeConfig;

use crate::errors::ServerError;

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/market.db";
const DEFAULT_STOREFRONT_URL: &str = "http://localhost:3000";
const DEFAULT_NOTIFICATION_RETRY_SECS: u64 = 300;
const DEFAULT_NOTIFICATION_MAX_ATTEMPTS: i64 = 5;
const DEFAULT_REFUND_RETRY_SECS: u64 = 60;
const DEFAULT_EMAIL_FROM: &str = "orders@localhost";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Base URL of the customer-facing storefront. Used to build the order links in customer e-mails.
    pub storefront_url: String,
    /// The platform's cut of every order, in whole percent, rounded down to the cent.
    pub platform_fee_percent: i64,
    pub notifications: NotificationConfig,
    /// Seconds between two passes over refunds the payment processor has not confirmed. A refund is only retried
    /// once it has been pending this long.
    pub refund_retry_secs: u64,
    pub stripe: StripeConfig,
    pub email: EmailConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.to_string(),
            port: DEFAULT_MKT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            storefront_url: DEFAULT_STOREFRONT_URL.to_string(),
            platform_fee_percent: DEFAULT_PLATFORM_FEE_PERCENT,
            notifications: NotificationConfig::default(),
            refund_retry_secs: DEFAULT_REFUND_RETRY_SECS,
            stripe: StripeConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MKT_HOST").ok().unwrap_or_else(|| DEFAULT_MKT_HOST.into());
        let port = parse_env("MKT_PORT", DEFAULT_MKT_PORT);
        let database_url = env::var("MKT_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ MKT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let storefront_url = env::var("MKT_STOREFRONT_URL").ok().unwrap_or_else(|| {
            info!("🪛️ MKT_STOREFRONT_URL is not set. Customer e-mails will link to {DEFAULT_STOREFRONT_URL}.");
            DEFAULT_STOREFRONT_URL.to_string()
        });
        let platform_fee_percent = parse_env("MKT_PLATFORM_FEE_PERCENT", DEFAULT_PLATFORM_FEE_PERCENT);
        let platform_fee_percent = if (0..=100).contains(&platform_fee_percent) {
            platform_fee_percent
        } else {
            error!(
                "🪛️ MKT_PLATFORM_FEE_PERCENT must be between 0 and 100. Using the default, \
                 {DEFAULT_PLATFORM_FEE_PERCENT}%, instead."
            );
            DEFAULT_PLATFORM_FEE_PERCENT
        };
        let notifications = NotificationConfig::from_env_or_default();
        let refund_retry_secs = parse_env("MKT_REFUND_RETRY_SECS", DEFAULT_REFUND_RETRY_SECS).max(1);
        let stripe = StripeConfig::new_from_env_or_default();
        let email = EmailConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth,
            storefront_url,
            platform_fee_percent,
            notifications,
            refund_retry_secs,
            stripe,
            email,
        }
    }
}

/// Reads and parses an environment variable, falling back to `default` (with a log message) when it is missing or
/// invalid.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret that vendor session tokens are signed with.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. Vendor sessions \
             issued elsewhere will NOT be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("MKT_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [MKT_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "MKT_JWT_SECRET must be at least 32 characters long".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}

//---------------------------------------------  NotificationConfig  ---------------------------------------------------
#[derive(Clone, Copy, Debug)]
pub struct NotificationConfig {
    /// Seconds between two passes over the undelivered notifications.
    pub retry_interval_secs: u64,
    /// Notifications that failed this many times are no longer retried.
    pub max_attempts: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { retry_interval_secs: DEFAULT_NOTIFICATION_RETRY_SECS, max_attempts: DEFAULT_NOTIFICATION_MAX_ATTEMPTS }
    }
}

impl NotificationConfig {
    pub fn from_env_or_default() -> Self {
        let retry_interval_secs = parse_env("MKT_NOTIFICATION_RETRY_SECS", DEFAULT_NOTIFICATION_RETRY_SECS).max(1);
        let max_attempts = parse_env("MKT_NOTIFICATION_MAX_ATTEMPTS", DEFAULT_NOTIFICATION_MAX_ATTEMPTS);
        Self { retry_interval_secs, max_attempts }
    }
}

//-------------------------------------------------  EmailConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct EmailConfig {
    /// The e-mail API endpoint that messages are POSTed to.
    pub api_url: String,
    pub api_token: Secret<String>,
    pub from: String,
    /// When false, notifications are written to the log instead of being sent.
    pub enabled: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: String::default(),
            api_token: Secret::default(),
            from: DEFAULT_EMAIL_FROM.to_string(),
            enabled: false,
        }
    }
}

impl EmailConfig {
    pub fn from_env_or_default() -> Self {
        let enabled = parse_boolean_flag(env::var("MKT_EMAIL_ENABLED").ok(), false);
        let api_url = env::var("MKT_EMAIL_API_URL").ok().unwrap_or_default();
        let api_token = Secret::new(env::var("MKT_EMAIL_API_TOKEN").ok().unwrap_or_default());
        let from = env::var("MKT_EMAIL_FROM").ok().unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string());
        if enabled && api_url.is_empty() {
            error!("🪛️ MKT_EMAIL_ENABLED is set, but MKT_EMAIL_API_URL is not. E-mail delivery will fail.");
        }
        if !enabled {
            info!("🪛️ E-mail delivery is disabled. Notifications will only be logged.");
        }
        Self { api_url, api_token, from, enabled }
    }
}
