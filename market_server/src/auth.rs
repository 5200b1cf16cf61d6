//! Vendor sessions.
//!
//! Vendors log in elsewhere and receive a JWT, signed with HS256 using the shared `MKT_JWT_SECRET`. Routes that act on
//! behalf of a vendor take a [`VendorClaims`] argument, which is only extracted when the request carries a valid,
//! unexpired token in its `Authorization: Bearer <token>` header.
use std::time::Duration;

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use market_engine::db_types::VendorId;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorClaims {
    pub vendor_id: VendorId,
    /// Expiry, in seconds since the Unix epoch
    pub exp: i64,
}

/// Signs and verifies vendor session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issues a session token for the vendor. The server itself never logs vendors in; this is used by tooling and
    /// tests.
    pub fn issue_token(&self, vendor_id: VendorId, duration: Option<Duration>) -> Result<String, AuthError> {
        let duration = duration.unwrap_or_else(|| Duration::from_secs(60 * 60 * 24));
        let exp = Utc::now().timestamp() + duration.as_secs() as i64;
        let claims = VendorClaims { vendor_id, exp };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }

    pub fn verify_token(&self, token: &str) -> Result<VendorClaims, AuthError> {
        let data = decode::<VendorClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        Ok(data.claims)
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".into()))
}

fn extract_claims(req: &HttpRequest) -> Result<VendorClaims, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::ConfigurationError("No token issuer has been configured".into()))?;
    let token = bearer_token(req)?;
    let claims = issuer.verify_token(token).map_err(|e| {
        debug!("💻️ Rejected vendor session. {e}");
        e
    })?;
    trace!("💻️ Authenticated {}", claims.vendor_id);
    Ok(claims)
}

impl FromRequest for VendorClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_claims(req))
    }
}
