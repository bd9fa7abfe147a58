//! Zap Ingestion Pipeline - Verified, exactly-once zap receipt ingestion
//!
//! Order of work for one event:
//! 1. canonical identifier check
//! 2. Schnorr signature check (plus the optional provider allow-list)
//! 3. zap receipt structure (kind, recipient, sender, amount)
//! 4. inside one store transaction: resolve target, insert the receipt keyed
//!    by source event id, credit the target total, recompute its ranking, commit
//!
//! Any failure inside the transaction drops it, so a duplicate or a missing
//! target never leaves a partially applied total behind.

use crate::{
    canonical::{decode_fixed_hex, EventCanonicalizer, PUBKEY_LEN},
    config::IngestionConfig,
    error::ZapTrustError,
    models::{
        IngestionOutcome, SignedEvent, TargetProjection, TargetRecord, TrustSignals, ValueReceipt,
        ZapTarget,
    },
    ranking::RankingEngine,
    signature::SignatureVerifier,
    store::{TargetLookup, ZapStore},
    target_resolver::TargetResolver,
    ZapTrustResult,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Structural fields of a verified zap receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapDetails {
    pub recipient_pubkey: String,
    pub sender_pubkey: String,
    /// Millisatoshis, always > 0
    pub amount: u64,
    pub bolt11: Option<String>,
}

/// The zap request embedded in a receipt's `description` tag
#[derive(Debug, Deserialize)]
struct EmbeddedZapRequest {
    pubkey: String,
    #[serde(default)]
    tags: Vec<Vec<String>>,
}

impl EmbeddedZapRequest {
    fn amount(&self) -> Option<&str> {
        self.tags.iter().find_map(|tag| match tag.as_slice() {
            [name, value, ..] if name == "amount" => Some(value.as_str()),
            _ => None,
        })
    }
}

fn normalized_pubkey(field: &str, value: &str) -> ZapTrustResult<String> {
    decode_fixed_hex::<PUBKEY_LEN>(field, value).map_err(ZapTrustError::invalid_receipt)?;
    Ok(value.to_ascii_lowercase())
}

/// Extract recipient, sender and amount from a zap receipt
pub fn parse_zap_details(event: &SignedEvent) -> ZapTrustResult<ZapDetails> {
    let recipient = event
        .tag_value("p")
        .ok_or_else(|| ZapTrustError::invalid_receipt("zap receipt has no recipient 'p' tag"))?;
    let recipient_pubkey = normalized_pubkey("recipient", recipient)?;

    let zap_request = event
        .tag_value("description")
        .map(|raw| {
            serde_json::from_str::<EmbeddedZapRequest>(raw).map_err(|e| {
                ZapTrustError::invalid_receipt(format!("malformed embedded zap request: {}", e))
            })
        })
        .transpose()?;

    let sender = event
        .tag_value("P")
        .or_else(|| zap_request.as_ref().map(|request| request.pubkey.as_str()))
        .ok_or_else(|| ZapTrustError::invalid_receipt("zap receipt does not identify a sender"))?;
    let sender_pubkey = normalized_pubkey("sender", sender)?;

    let raw_amount = event
        .tag_value("amount")
        .or_else(|| zap_request.as_ref().and_then(EmbeddedZapRequest::amount))
        .ok_or_else(|| ZapTrustError::invalid_receipt("zap receipt carries no amount"))?;
    let amount: u64 = raw_amount.trim().parse().map_err(|_| {
        ZapTrustError::invalid_receipt(format!("amount '{}' is not a positive integer", raw_amount))
    })?;
    if amount == 0 {
        return Err(ZapTrustError::invalid_receipt("amount must be greater than 0"));
    }

    Ok(ZapDetails {
        recipient_pubkey,
        sender_pubkey,
        amount,
        bolt11: event.tag_value("bolt11").map(str::to_string),
    })
}

/// Orchestrates verification and atomic persistence of zap receipts
pub struct ZapIngestionPipeline<S: ZapStore> {
    config: IngestionConfig,
    store: Arc<S>,
    canonicalizer: EventCanonicalizer,
    verifier: SignatureVerifier,
    resolver: TargetResolver,
    ranking: RankingEngine,
}

impl<S: ZapStore> ZapIngestionPipeline<S> {
    pub fn new(config: &IngestionConfig, store: Arc<S>) -> Self {
        Self {
            config: config.clone(),
            store,
            canonicalizer: EventCanonicalizer::new(),
            verifier: SignatureVerifier::new(),
            resolver: TargetResolver::new(),
            ranking: RankingEngine::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Pure verification of a zap receipt; touches no storage
    pub fn verify(&self, event: &SignedEvent) -> ZapTrustResult<ZapDetails> {
        let digest = self.canonicalizer.validate_identifier(event)?;
        self.verifier.verify_digest(event, &digest)?;

        if !self.config.trusts_provider(&event.pubkey) {
            return Err(ZapTrustError::signature(format!(
                "receipt signer {} is not a trusted payment provider",
                event.pubkey
            )));
        }

        if !self.config.accepts_kind(event.kind) {
            return Err(ZapTrustError::invalid_receipt(format!(
                "event kind {} is not an accepted zap receipt kind",
                event.kind
            )));
        }

        parse_zap_details(event)
    }

    /// Ingest a zap receipt exactly once
    pub async fn ingest(&self, event: &SignedEvent) -> ZapTrustResult<IngestionOutcome> {
        self.ingest_at(event, Utc::now()).await
    }

    /// Ingest with rankings evaluated at `now`
    pub async fn ingest_at(
        &self,
        event: &SignedEvent,
        now: DateTime<Utc>,
    ) -> ZapTrustResult<IngestionOutcome> {
        let details = self.verify(event)?;
        debug!(event_id = %event.id, amount = details.amount, "Zap receipt verified");

        let mut tx = self.store.begin().await?;

        let mut record = self.resolver.resolve(event, &*tx).await?;

        let receipt = ValueReceipt::new(
            record.target,
            details.sender_pubkey,
            details.recipient_pubkey,
            details.amount,
            event.id.to_ascii_lowercase(),
            details.bolt11,
        );
        tx.insert_receipt(receipt.clone()).await?;

        record.value_total = record
            .value_total
            .checked_add(receipt.amount)
            .ok_or_else(|| ZapTrustError::invalid_receipt("target value total would overflow"))?;
        self.rescore(&mut record, now);
        tx.save_target(record.clone()).await?;

        tx.commit().await?;

        info!(
            event_id = %receipt.source_event_id,
            zap_target = %record.target,
            amount = receipt.amount,
            value_total = record.value_total,
            ranking_score = record.ranking_score,
            "Ingested zap receipt"
        );

        Ok(IngestionOutcome {
            receipt,
            target: record.projection(),
        })
    }

    /// Replace a target's trust signals and recompute its score
    pub async fn update_signals(
        &self,
        target: ZapTarget,
        signals: TrustSignals,
        now: DateTime<Utc>,
    ) -> ZapTrustResult<TargetProjection> {
        self.mutate_target(target, now, |record| record.signals = signals)
            .await
    }

    /// Set or clear the suspicious flag and recompute the score
    pub async fn set_suspicion_flag(
        &self,
        target: ZapTarget,
        flagged: bool,
        now: DateTime<Utc>,
    ) -> ZapTrustResult<TargetProjection> {
        self.mutate_target(target, now, |record| {
            record.signals.flagged_suspicious = flagged
        })
        .await
    }

    /// Periodic refresh: recompute from the latest committed total
    pub async fn refresh_ranking(
        &self,
        target: ZapTarget,
        now: DateTime<Utc>,
    ) -> ZapTrustResult<TargetProjection> {
        self.mutate_target(target, now, |_| {}).await
    }

    async fn mutate_target<F>(
        &self,
        target: ZapTarget,
        now: DateTime<Utc>,
        apply: F,
    ) -> ZapTrustResult<TargetProjection>
    where
        F: FnOnce(&mut TargetRecord) + Send,
    {
        let mut tx = self.store.begin().await?;
        let mut record = tx.target(&target).await?.ok_or_else(|| {
            ZapTrustError::target_not_found(
                target.kind(),
                target.id().map(|id| id.to_string()).unwrap_or_default(),
            )
        })?;

        apply(&mut record);
        self.rescore(&mut record, now);
        tx.save_target(record.clone()).await?;
        tx.commit().await?;

        debug!(zap_target = %record.target, ranking_score = record.ranking_score, "Rescored target");
        Ok(record.projection())
    }

    fn rescore(&self, record: &mut TargetRecord, now: DateTime<Utc>) {
        record.ranking_score = self.ranking.score_target(record, now).value();
        record.updated_at = now;
    }
}
