//! Core data models for the trust engine
//!
//! Signed events arrive from upstream relays, receipts and target records are
//! what the store persists, and the remaining types are ephemeral values
//! passed between the ranking, payout and session components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Externally signed Nostr-style event (a zap receipt in this domain)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    /// Canonical digest of the other fields (hex, 32 bytes)
    pub id: String,
    /// Signer x-only public key (hex, 32 bytes)
    pub pubkey: String,
    /// Unix timestamp in seconds
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    /// Schnorr signature over `id` (hex, 64 bytes)
    pub sig: String,
}

impl SignedEvent {
    /// Value of the first `name` tag that carries one
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags.iter().find_map(|tag| match tag.as_slice() {
            [tag_name, value, ..] if tag_name == name => Some(value.as_str()),
            _ => None,
        })
    }
}

/// Kind of marketplace entity credited by a zap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    Review,
    Game,
    Comment,
    Platform,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Review => "REVIEW",
            Self::Game => "GAME",
            Self::Comment => "COMMENT",
            Self::Platform => "PLATFORM",
        };
        f.write_str(name)
    }
}

/// A resolved zap target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZapTarget {
    Review(Uuid),
    Game(Uuid),
    Comment(Uuid),
    Platform,
}

impl ZapTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Review(_) => TargetKind::Review,
            Self::Game(_) => TargetKind::Game,
            Self::Comment(_) => TargetKind::Comment,
            Self::Platform => TargetKind::Platform,
        }
    }

    /// Domain id of the target; the platform has none
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Self::Review(id) | Self::Game(id) | Self::Comment(id) => Some(*id),
            Self::Platform => None,
        }
    }
}

impl fmt::Display for ZapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}:{}", self.kind(), id),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// Persisted record of one verified, attributed value transfer. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueReceipt {
    pub id: Uuid,
    pub target: ZapTarget,
    pub sender_pubkey: String,
    pub recipient_pubkey: String,
    /// Smallest monetary unit (millisatoshis), always > 0
    pub amount: u64,
    /// Idempotency key, unique across all receipts
    pub source_event_id: String,
    pub bolt11: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl ValueReceipt {
    pub fn new(
        target: ZapTarget,
        sender_pubkey: String,
        recipient_pubkey: String,
        amount: u64,
        source_event_id: String,
        bolt11: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            sender_pubkey,
            recipient_pubkey,
            amount,
            source_event_id,
            bolt11,
            received_at: Utc::now(),
        }
    }

    pub fn target_kind(&self) -> TargetKind {
        self.target.kind()
    }

    pub fn target_id(&self) -> Option<Uuid> {
        self.target.id()
    }
}

/// Trust flags feeding the ranking multiplier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSignals {
    /// Content author bought the item being reviewed
    pub verified_transaction: bool,
    /// Content author has an attested identity
    pub identity_attested: bool,
    pub flagged_suspicious: bool,
}

/// Stored state of a zap target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub target: ZapTarget,
    pub author_pubkey: Option<String>,
    pub content_created_at: DateTime<Utc>,
    /// Cumulative verified value in millisatoshis
    pub value_total: u64,
    pub signals: TrustSignals,
    pub ranking_score: f64,
    pub updated_at: DateTime<Utc>,
}

impl TargetRecord {
    /// Create a new target record with no zaps yet
    pub fn new(
        target: ZapTarget,
        author_pubkey: Option<String>,
        content_created_at: DateTime<Utc>,
        signals: TrustSignals,
    ) -> Self {
        Self {
            target,
            author_pubkey,
            content_created_at,
            value_total: 0,
            signals,
            ranking_score: 0.0,
            updated_at: Utc::now(),
        }
    }

    /// The always-present platform target
    pub fn platform() -> Self {
        Self::new(
            ZapTarget::Platform,
            None,
            DateTime::<Utc>::UNIX_EPOCH,
            TrustSignals::default(),
        )
    }

    pub fn projection(&self) -> TargetProjection {
        TargetProjection {
            target: self.target,
            value_total: self.value_total,
            ranking_score: self.ranking_score,
        }
    }
}

/// Boundary-out view of a target after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetProjection {
    pub target: ZapTarget,
    pub value_total: u64,
    pub ranking_score: f64,
}

/// Result of a successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub receipt: ValueReceipt,
    pub target: TargetProjection,
}

/// Inputs to one ranking computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingInput {
    pub value_total: u64,
    pub verified_transaction: bool,
    pub identity_attested: bool,
    pub flagged_suspicious: bool,
    pub content_created_at: DateTime<Utc>,
    /// Evaluation time; `None` means now
    pub reference_time: Option<DateTime<Utc>>,
}

/// Non-negative trust-weighted ranking score
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RankingScore(f64);

impl RankingScore {
    pub(crate) fn new(value: f64) -> Self {
        Self(value.max(0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Claims carried inside a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "sub")]
    pub subject_id: String,
    /// Unix seconds
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Unix seconds
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Random hex; only makes otherwise identical tokens distinct
    pub nonce: String,
}

/// Developer/platform division of a purchase amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSplit {
    pub total: u64,
    pub developer_share: u64,
    pub platform_share: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_value_picks_first_match() {
        let event = SignedEvent {
            id: String::new(),
            pubkey: String::new(),
            created_at: 0,
            kind: 9735,
            tags: vec![
                vec!["p".to_string()],
                vec!["p".to_string(), "first".to_string()],
                vec!["p".to_string(), "second".to_string()],
            ],
            content: String::new(),
            sig: String::new(),
        };

        assert_eq!(event.tag_value("p"), Some("first"));
        assert_eq!(event.tag_value("missing"), None);
    }

    #[test]
    fn test_target_kind_and_id() {
        let id = Uuid::new_v4();
        assert_eq!(ZapTarget::Review(id).kind(), TargetKind::Review);
        assert_eq!(ZapTarget::Comment(id).id(), Some(id));
        assert_eq!(ZapTarget::Platform.id(), None);
        assert_eq!(ZapTarget::Platform.to_string(), "PLATFORM");
    }

    #[test]
    fn test_target_serializes_tagged() {
        let json = serde_json::to_value(ZapTarget::Platform).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "PLATFORM" }));
    }

    #[test]
    fn test_platform_record_starts_empty() {
        let record = TargetRecord::platform();
        assert_eq!(record.value_total, 0);
        assert_eq!(record.projection().target, ZapTarget::Platform);
    }
}
