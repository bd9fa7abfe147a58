//! Trust Node - High-level API for the verification and settlement engine
//!
//! This module provides the main interface embedders use. It wires the
//! ingestion pipeline (which owns ranking), the session codec and the payout
//! splitter to one validated [`EngineConfig`] and a shared store.

use crate::{
    config::EngineConfig,
    ingestion::ZapIngestionPipeline,
    models::{
        IngestionOutcome, RevenueSplit, SessionClaims, SignedEvent, TargetProjection,
        TargetRecord, TrustSignals, ZapTarget,
    },
    payout::PayoutSplitter,
    session::SessionTokenCodec,
    store::{TargetLookup, ZapStore},
    ZapTrustResult,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Main node that coordinates all components
pub struct TrustNode<S: ZapStore> {
    config: EngineConfig,
    store: Arc<S>,
    /// Zap verification and exactly-once persistence
    pipeline: ZapIngestionPipeline<S>,
    sessions: SessionTokenCodec,
    payouts: PayoutSplitter,
}

impl<S: ZapStore> TrustNode<S> {
    /// Create a node; fails if the configuration is incomplete
    pub async fn new(config: EngineConfig, store: Arc<S>) -> ZapTrustResult<Self> {
        info!("Initializing trust node");
        config.validate()?;

        let pipeline = ZapIngestionPipeline::new(&config.ingestion, store.clone());

        info!(
            accepted_kinds = ?config.ingestion.accepted_kinds,
            trusted_providers = config.ingestion.trusted_provider_pubkeys.len(),
            "Trust node initialized"
        );

        Ok(Self {
            config,
            store,
            pipeline,
            sessions: SessionTokenCodec::new(),
            payouts: PayoutSplitter::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Verify and record a zap receipt exactly once
    pub async fn ingest_zap(&self, event: &SignedEvent) -> ZapTrustResult<IngestionOutcome> {
        self.pipeline.ingest(event).await
    }

    /// Make a marketplace review, game or comment zappable
    pub async fn register_target(
        &self,
        target: ZapTarget,
        author_pubkey: Option<String>,
        content_created_at: DateTime<Utc>,
        signals: TrustSignals,
    ) -> ZapTrustResult<()> {
        let record = TargetRecord::new(target, author_pubkey, content_created_at, signals);
        self.store.register_target(record).await
    }

    /// Issue a session token; `ttl_seconds` defaults to the configured TTL
    pub fn issue_session(&self, subject_id: &str, ttl_seconds: Option<i64>) -> ZapTrustResult<String> {
        let ttl = ttl_seconds.unwrap_or(self.config.session.default_ttl_seconds);
        self.sessions
            .create(subject_id, self.config.session.secret()?, ttl)
    }

    pub fn verify_session(&self, token: &str) -> ZapTrustResult<SessionClaims> {
        self.sessions.decode(token, self.config.session.secret()?)
    }

    /// Split a purchase total between developer and platform
    pub fn split_payout(&self, total: i64) -> RevenueSplit {
        self.payouts.split(total)
    }

    pub async fn set_suspicion_flag(
        &self,
        target: ZapTarget,
        flagged: bool,
    ) -> ZapTrustResult<TargetProjection> {
        info!(zap_target = %target, flagged, "Updating suspicion flag");
        self.pipeline
            .set_suspicion_flag(target, flagged, Utc::now())
            .await
    }

    pub async fn update_signals(
        &self,
        target: ZapTarget,
        signals: TrustSignals,
    ) -> ZapTrustResult<TargetProjection> {
        self.pipeline
            .update_signals(target, signals, Utc::now())
            .await
    }

    /// Recompute a target's score as of `now` so decay takes effect
    pub async fn refresh_ranking(
        &self,
        target: ZapTarget,
        now: DateTime<Utc>,
    ) -> ZapTrustResult<TargetProjection> {
        self.pipeline.refresh_ranking(target, now).await
    }

    pub async fn target_projection(
        &self,
        target: &ZapTarget,
    ) -> ZapTrustResult<Option<TargetProjection>> {
        Ok(self
            .store
            .target(target)
            .await?
            .map(|record| record.projection()))
    }

    /// Get node health status
    pub async fn health_check(&self) -> ZapTrustResult<NodeHealth> {
        let mut issues = Vec::new();

        match self.store.target(&ZapTarget::Platform).await {
            Ok(Some(_)) => {}
            Ok(None) => issues.push("Store is missing the platform target".to_string()),
            Err(e) => issues.push(format!("Store error: {}", e)),
        }

        if let Err(e) = self.config.validate() {
            issues.push(format!("Configuration error: {}", e));
        }

        Ok(NodeHealth {
            healthy: issues.is_empty(),
            issues,
            timestamp: Utc::now(),
        })
    }
}

/// Node health status
#[derive(Debug, Clone)]
pub struct NodeHealth {
    pub healthy: bool,
    pub issues: Vec<String>,
    pub timestamp: DateTime<Utc>,
}
