//! Session Token Codec - Stateless, tamper-evident bearer tokens
//!
//! Wire form: `base64url(claims JSON) "." base64url(HMAC-SHA256(secret, claims JSON))`.
//! The MAC covers the exact claim bytes carried in the token, so decoding never
//! re-serializes before checking. There is no server-side state or revocation.

use crate::{
    config::SessionSecret,
    error::ZapTrustError,
    models::SessionClaims,
    ZapTrustResult,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;

/// Issues and verifies session tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionTokenCodec;

impl SessionTokenCodec {
    pub fn new() -> Self {
        Self
    }

    /// Issue a token for `subject_id` valid for `ttl_seconds` from now
    pub fn create(
        &self,
        subject_id: &str,
        secret: &SessionSecret,
        ttl_seconds: i64,
    ) -> ZapTrustResult<String> {
        self.create_at(subject_id, secret, ttl_seconds, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn create_at(
        &self,
        subject_id: &str,
        secret: &SessionSecret,
        ttl_seconds: i64,
        now: DateTime<Utc>,
    ) -> ZapTrustResult<String> {
        if ttl_seconds <= 0 {
            return Err(ZapTrustError::invalid_argument(format!(
                "ttl_seconds must be positive, got {}",
                ttl_seconds
            )));
        }

        if subject_id.is_empty() {
            return Err(ZapTrustError::invalid_argument("subject id cannot be empty"));
        }

        let issued_at = now.timestamp();
        let expires_at = issued_at.checked_add(ttl_seconds).ok_or_else(|| {
            ZapTrustError::invalid_argument(format!("ttl_seconds {} overflows", ttl_seconds))
        })?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let claims = SessionClaims {
            subject_id: subject_id.to_string(),
            issued_at,
            expires_at,
            nonce: hex::encode(nonce),
        };

        let claim_bytes = serde_json::to_vec(&claims)
            .map_err(|e| ZapTrustError::invalid_argument(format!("unencodable claims: {}", e)))?;
        let tag = compute_mac(secret, &claim_bytes)?;

        info!(subject = subject_id, expires_at, "Issued session token");

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&claim_bytes),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Verify a token and return its claims
    pub fn decode(&self, token: &str, secret: &SessionSecret) -> ZapTrustResult<SessionClaims> {
        self.decode_at(token, secret, Utc::now())
    }

    /// Verify a token as if the current time were `now`. Expiry is compared at
    /// full precision: a token is valid at exactly `exp` and expired after it.
    pub fn decode_at(
        &self,
        token: &str,
        secret: &SessionSecret,
        now: DateTime<Utc>,
    ) -> ZapTrustResult<SessionClaims> {
        let (claims_part, tag_part) = token
            .split_once('.')
            .ok_or_else(|| ZapTrustError::invalid_token("missing MAC separator"))?;

        let claim_bytes = URL_SAFE_NO_PAD
            .decode(claims_part)
            .map_err(|e| ZapTrustError::invalid_token(format!("claims are not base64url: {}", e)))?;
        let presented = URL_SAFE_NO_PAD
            .decode(tag_part)
            .map_err(|e| ZapTrustError::invalid_token(format!("MAC is not base64url: {}", e)))?;

        let expected = compute_mac(secret, &claim_bytes)?;
        if presented.len() != expected.len() || !bool::from(expected.ct_eq(presented.as_slice())) {
            return Err(ZapTrustError::invalid_token("MAC mismatch"));
        }

        let claims: SessionClaims = serde_json::from_slice(&claim_bytes)
            .map_err(|e| ZapTrustError::invalid_token(format!("malformed claims: {}", e)))?;

        let expires_at = DateTime::from_timestamp(claims.expires_at, 0)
            .ok_or_else(|| ZapTrustError::invalid_token("expiry is out of range"))?;
        if now > expires_at {
            return Err(ZapTrustError::ExpiredSessionToken {
                expired_at: expires_at,
            });
        }

        debug!(subject = %claims.subject_id, "Session token verified");
        Ok(claims)
    }
}

fn compute_mac(secret: &SessionSecret, payload: &[u8]) -> ZapTrustResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(secret.expose())
        .map_err(|e| ZapTrustError::invalid_argument(format!("invalid session secret: {}", e)))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().into())
}
