//! Target Resolver - Attributes a verified zap to exactly one target
//!
//! Each target kind has its own [`AttributeValue`] implementation that knows
//! which reference tag it owns. The resolver asks them in order of
//! specificity (comment, review, game) and falls back to the platform. It only
//! reads existing targets and never mutates anything.

use crate::{
    error::ZapTrustError,
    models::{SignedEvent, TargetKind, TargetRecord, ZapTarget},
    store::TargetLookup,
    ZapTrustResult,
};
use uuid::Uuid;

pub const COMMENT_TAG: &str = "comment";
pub const REVIEW_TAG: &str = "review";
pub const GAME_TAG: &str = "game";

/// Capability shared by every target kind: recognise a reference to it
pub trait AttributeValue: Send + Sync {
    fn kind(&self) -> TargetKind;

    /// The target this event references, if it carries this kind's tag
    fn reference(&self, event: &SignedEvent) -> ZapTrustResult<Option<ZapTarget>>;
}

/// Parse the UUID carried by the first `tag` on the event
fn tagged_id(event: &SignedEvent, tag: &str) -> ZapTrustResult<Option<Uuid>> {
    event
        .tag_value(tag)
        .map(|value| {
            Uuid::parse_str(value).map_err(|e| {
                ZapTrustError::invalid_receipt(format!(
                    "{} reference '{}' is not a valid id: {}",
                    tag, value, e
                ))
            })
        })
        .transpose()
}

pub struct CommentAttribution;

impl AttributeValue for CommentAttribution {
    fn kind(&self) -> TargetKind {
        TargetKind::Comment
    }

    fn reference(&self, event: &SignedEvent) -> ZapTrustResult<Option<ZapTarget>> {
        Ok(tagged_id(event, COMMENT_TAG)?.map(ZapTarget::Comment))
    }
}

pub struct ReviewAttribution;

impl AttributeValue for ReviewAttribution {
    fn kind(&self) -> TargetKind {
        TargetKind::Review
    }

    fn reference(&self, event: &SignedEvent) -> ZapTrustResult<Option<ZapTarget>> {
        Ok(tagged_id(event, REVIEW_TAG)?.map(ZapTarget::Review))
    }
}

pub struct GameAttribution;

impl AttributeValue for GameAttribution {
    fn kind(&self) -> TargetKind {
        TargetKind::Game
    }

    fn reference(&self, event: &SignedEvent) -> ZapTrustResult<Option<ZapTarget>> {
        Ok(tagged_id(event, GAME_TAG)?.map(ZapTarget::Game))
    }
}

/// Catch-all: any zap can be attributed to the platform
pub struct PlatformAttribution;

impl AttributeValue for PlatformAttribution {
    fn kind(&self) -> TargetKind {
        TargetKind::Platform
    }

    fn reference(&self, _event: &SignedEvent) -> ZapTrustResult<Option<ZapTarget>> {
        Ok(Some(ZapTarget::Platform))
    }
}

/// Ordered set of attributions
pub struct TargetResolver {
    attributions: Vec<Box<dyn AttributeValue>>,
}

impl TargetResolver {
    pub fn new() -> Self {
        Self {
            attributions: vec![
                Box::new(CommentAttribution),
                Box::new(ReviewAttribution),
                Box::new(GameAttribution),
                Box::new(PlatformAttribution),
            ],
        }
    }

    /// The target the event references, without checking it exists
    pub fn reference(&self, event: &SignedEvent) -> ZapTrustResult<ZapTarget> {
        for attribution in &self.attributions {
            if let Some(target) = attribution.reference(event)? {
                return Ok(target);
            }
        }
        Ok(ZapTarget::Platform)
    }

    /// Resolve the event's target and load its current record
    pub async fn resolve<L>(&self, event: &SignedEvent, lookup: &L) -> ZapTrustResult<TargetRecord>
    where
        L: TargetLookup + ?Sized,
    {
        let target = self.reference(event)?;

        lookup.target(&target).await?.ok_or_else(|| {
            let id = target
                .id()
                .map(|id| id.to_string())
                .unwrap_or_default();
            ZapTrustError::target_not_found(target.kind(), id)
        })
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::TrustSignals,
        store::{MemoryZapStore, ZapStore},
        test_support::{tag, zap_receipt, test_keypair},
    };
    use chrono::Utc;

    async fn store_with(target: ZapTarget) -> MemoryZapStore {
        let store = MemoryZapStore::new();
        store
            .register_target(TargetRecord::new(
                target,
                None,
                Utc::now(),
                TrustSignals::default(),
            ))
            .await
            .unwrap();
        store
    }

    fn receipt_with(tags: Vec<Vec<String>>) -> SignedEvent {
        zap_receipt(&test_keypair(1), &"aa".repeat(32), &"bb".repeat(32), 1_000, tags)
    }

    #[tokio::test]
    async fn test_untagged_zap_goes_to_platform() {
        let resolver = TargetResolver::new();
        let store = MemoryZapStore::new();

        let record = resolver.resolve(&receipt_with(vec![]), &store).await.unwrap();
        assert_eq!(record.target, ZapTarget::Platform);
    }

    #[tokio::test]
    async fn test_review_reference_resolves() {
        let resolver = TargetResolver::new();
        let review = Uuid::new_v4();
        let store = store_with(ZapTarget::Review(review)).await;

        let event = receipt_with(vec![tag(REVIEW_TAG, &review.to_string())]);
        let record = resolver.resolve(&event, &store).await.unwrap();
        assert_eq!(record.target, ZapTarget::Review(review));
    }

    #[tokio::test]
    async fn test_most_specific_reference_wins() {
        let resolver = TargetResolver::new();
        let game = Uuid::new_v4();
        let comment = Uuid::new_v4();

        let event = receipt_with(vec![
            tag(GAME_TAG, &game.to_string()),
            tag(COMMENT_TAG, &comment.to_string()),
        ]);
        assert_eq!(resolver.reference(&event).unwrap(), ZapTarget::Comment(comment));
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let resolver = TargetResolver::new();
        let store = MemoryZapStore::new();
        let game = Uuid::new_v4();

        let event = receipt_with(vec![tag(GAME_TAG, &game.to_string())]);
        match resolver.resolve(&event, &store).await {
            Err(ZapTrustError::ZapTargetNotFound { kind, id }) => {
                assert_eq!(kind, TargetKind::Game);
                assert_eq!(id, game.to_string());
            }
            other => panic!("Expected target not found, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_reference_is_invalid_receipt() {
        let resolver = TargetResolver::new();
        let event = receipt_with(vec![tag(REVIEW_TAG, "not-a-uuid")]);

        assert!(matches!(
            resolver.reference(&event),
            Err(ZapTrustError::InvalidZapReceipt(_))
        ));
    }

    #[test]
    fn test_each_attribution_reports_its_kind() {
        let kinds: Vec<TargetKind> = TargetResolver::new()
            .attributions
            .iter()
            .map(|a| a.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                TargetKind::Comment,
                TargetKind::Review,
                TargetKind::Game,
                TargetKind::Platform
            ]
        );
    }
}
