//! Trust verification and settlement engine for a zap-funded game marketplace
//!
//! This crate turns signed Nostr zap receipts into verified value using:
//! - NIP-01 canonical event ids and BIP-340 Schnorr signatures
//! - An exactly-once, all-or-nothing ingestion unit of work
//! - Trust-weighted, time-decayed ranking of reviews, games and comments
//! - Remainder-exact developer/platform revenue splits
//! - HMAC-authenticated stateless session tokens

pub mod canonical;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod models;
pub mod node;
pub mod payout;
pub mod ranking;
pub mod session;
pub mod signature;
pub mod store;
pub mod target_resolver;

#[cfg(test)]
mod test_support;

pub use config::{EngineConfig, SessionSecret};
pub use error::ZapTrustError;
pub use node::TrustNode;

/// Result type alias for engine operations
pub type ZapTrustResult<T> = Result<T, ZapTrustError>;
