//! Engine configuration
//!
//! Built once at startup (from defaults, an optional file and `ZAPTRUST__*`
//! environment overrides) and passed by reference into the session codec and
//! the ingestion pipeline. Nothing in the engine reads settings globally.

use crate::{error::ZapTrustError, ZapTrustResult};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Nostr kind of a zap receipt
pub const ZAP_RECEIPT_KIND: u32 = 9735;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "ZAPTRUST";

/// HMAC key for session tokens. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSecret(Vec<u8>);

impl SessionSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> ZapTrustResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ZapTrustError::invalid_argument(
                "session secret cannot be empty",
            ));
        }
        Ok(Self(bytes))
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for SessionSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw.into_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Configuration for session token issuance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Shared MAC secret; required
    pub secret: Option<SessionSecret>,
    /// Lifetime used when the caller does not pick one
    pub default_ttl_seconds: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            default_ttl_seconds: 3600, // 1 hour
        }
    }
}

impl SessionConfig {
    pub fn secret(&self) -> ZapTrustResult<&SessionSecret> {
        self.secret
            .as_ref()
            .ok_or_else(|| ZapTrustError::config("session.secret is not set"))
    }

    pub fn validate(&self) -> ZapTrustResult<()> {
        self.secret()?;

        if self.default_ttl_seconds <= 0 {
            return Err(ZapTrustError::config(format!(
                "session.default_ttl_seconds must be positive, got {}",
                self.default_ttl_seconds
            )));
        }

        Ok(())
    }
}

/// Configuration for the zap ingestion pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Event kinds accepted as zap receipts
    pub accepted_kinds: Vec<u32>,
    /// Payment-provider keys allowed to sign receipts; empty accepts any signer
    pub trusted_provider_pubkeys: Vec<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            accepted_kinds: vec![ZAP_RECEIPT_KIND],
            trusted_provider_pubkeys: Vec::new(),
        }
    }
}

impl IngestionConfig {
    pub fn validate(&self) -> ZapTrustResult<()> {
        if self.accepted_kinds.is_empty() {
            return Err(ZapTrustError::config(
                "ingestion.accepted_kinds cannot be empty",
            ));
        }
        Ok(())
    }

    pub fn accepts_kind(&self, kind: u32) -> bool {
        self.accepted_kinds.contains(&kind)
    }

    pub fn trusts_provider(&self, pubkey: &str) -> bool {
        self.trusted_provider_pubkeys.is_empty()
            || self
                .trusted_provider_pubkeys
                .iter()
                .any(|trusted| trusted.eq_ignore_ascii_case(pubkey))
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub ingestion: IngestionConfig,
}

impl EngineConfig {
    /// Load from an optional config file plus `ZAPTRUST__SECTION__KEY` overrides
    pub fn load(path: Option<&str>) -> ZapTrustResult<Self> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without validation, for callers that only need some sections
    pub fn load_unvalidated(path: Option<&str>) -> ZapTrustResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ZapTrustError::config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ZapTrustError::config(e.to_string()))
    }

    pub fn validate(&self) -> ZapTrustResult<()> {
        self.session.validate()?;
        self.ingestion.validate()
    }

    /// Convenience for tests and embedders that already hold a secret
    pub fn with_secret(secret: SessionSecret) -> Self {
        Self {
            session: SessionConfig {
                secret: Some(secret),
                ..SessionConfig::default()
            },
            ingestion: IngestionConfig::default(),
        }
    }
}
