//! Verification of signed webhook deliveries.
//!
//! Each delivery carries a `Stripe-Signature` header of the form `t=<unix timestamp>,v1=<hex signature>[,v1=...]`.
//! The signature is the HMAC-SHA256 of `"{t}.{raw body}"` keyed with the endpoint's signing secret. A delivery is
//! accepted when any `v1` entry matches and the timestamp is within the tolerance window. Verification must run on the
//! raw request bytes, before any JSON parsing.
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::{StripeEvent, WebhookError};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

pub fn parse_signature_header(header: &str) -> Result<SignatureHeader, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for item in header.split(',') {
        let (key, value) = item
            .trim()
            .split_once('=')
            .ok_or_else(|| WebhookError::MalformedHeader(format!("Invalid element '{item}'")))?;
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|_| WebhookError::MalformedHeader(format!("Invalid timestamp '{value}'")))?;
                timestamp = Some(t);
            },
            "v1" => {
                // Undecodable entries can never match, so they are skipped rather than failing the whole header
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            },
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| WebhookError::MalformedHeader("No timestamp".into()))?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader("No v1 signatures".into()));
    }
    Ok(SignatureHeader { timestamp, signatures })
}

fn signing_mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap_or_else(|_| unreachable!());
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Hex-encoded v1 signature for the given payload and timestamp.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    hex::encode(signing_mac(secret, timestamp, payload).finalize().into_bytes())
}

/// Produces a complete signature header value. Useful for clients and tests that need to sign a payload.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("t={timestamp},v1={}", compute_signature(secret, timestamp, payload))
}

pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), WebhookError> {
    let header = parse_signature_header(header)?;
    let mac = signing_mac(secret, header.timestamp, payload);
    let matched = header.signatures.iter().any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
        warn!("💳️ Webhook signature mismatch");
        return Err(WebhookError::SignatureMismatch);
    }
    if tolerance_secs > 0 && (now - header.timestamp).abs() > tolerance_secs {
        warn!("💳️ Webhook timestamp {} is too far from the current time {now}", header.timestamp);
        return Err(WebhookError::TimestampOutOfTolerance { timestamp: header.timestamp });
    }
    Ok(())
}

/// Verifies the signature and only then parses the payload.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<StripeEvent, WebhookError> {
    verify_signature(payload, header, secret, tolerance_secs, now)?;
    serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}
