//! Verification of identity-provider webhooks.
//!
//! Deliveries are signed with HMAC-SHA256 over `"{id}.{timestamp}.{body}"`.
//! The shared secret is distributed as `whsec_<base64 key>`, and the signature
//! header carries one or more space-separated `v1,<base64 signature>` entries
//! (several appear while a secret is being rotated).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Accepted clock skew between the sender and us, in seconds.
pub const TIMESTAMP_TOLERANCE_SECS: u64 = 5 * 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing webhook header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid webhook timestamp")]
    InvalidTimestamp,

    #[error("webhook timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("invalid webhook secret")]
    InvalidSecret,

    #[error("invalid webhook payload: {0}")]
    Payload(String),
}

/// Raw values of the three signing headers, if present.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders<'a> {
    pub id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Build a verifier from a `whsec_`-prefixed secret. The prefix is optional.
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| WebhookError::InvalidSecret)?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }
        Ok(Self { key })
    }

    pub fn verify(&self, headers: &WebhookHeaders<'_>, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(headers, body, Utc::now())
    }

    pub fn verify_at(
        &self,
        headers: &WebhookHeaders<'_>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), WebhookError> {
        let id = headers.id.ok_or(WebhookError::MissingHeader(HEADER_ID))?;
        let timestamp = headers
            .timestamp
            .ok_or(WebhookError::MissingHeader(HEADER_TIMESTAMP))?;
        let signatures = headers
            .signature
            .ok_or(WebhookError::MissingHeader(HEADER_SIGNATURE))?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        let skew = now
            .timestamp()
            .checked_sub(sent_at)
            .map(i64::unsigned_abs)
            .filter(|skew| *skew <= TIMESTAMP_TOLERANCE_SECS);
        if skew.is_none() {
            tracing::debug!(webhook_id = id, sent_at, "webhook timestamp outside tolerance");
            return Err(WebhookError::TimestampOutOfTolerance);
        }

        let mac = self.mac_for(id, timestamp.trim(), body)?;

        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    /// Produce a `v1,<signature>` header value. Used by senders and tests.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
        let mac = self.mac_for(id, &timestamp.to_string(), body)?;
        let sig = STANDARD.encode(mac.finalize().into_bytes());
        Ok(format!("{SIGNATURE_VERSION},{sig}"))
    }

    fn mac_for(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, WebhookError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }
}
