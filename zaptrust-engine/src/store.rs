//! Zap Store - Persistence boundary for receipts and target aggregates
//!
//! The pipeline talks to storage only through these traits. A unit of work is
//! opened with [`ZapStore::begin`]; [`StoreTransaction::insert_receipt`] is
//! the single insert-if-absent operation keyed by source event id, and nothing
//! staged in a transaction becomes visible unless [`StoreTransaction::commit`]
//! runs. Dropping a transaction discards it.

use crate::{
    error::ZapTrustError,
    models::{TargetRecord, ValueReceipt, ZapTarget},
    ZapTrustResult,
};
use async_trait::async_trait;
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

/// Read-only access to existing targets
#[async_trait]
pub trait TargetLookup: Send + Sync {
    async fn target(&self, target: &ZapTarget) -> ZapTrustResult<Option<TargetRecord>>;
}

/// An open, all-or-nothing unit of work
#[async_trait]
pub trait StoreTransaction: TargetLookup {
    /// Insert a receipt unless one with the same source event id exists.
    /// Fails with `ZapAlreadyProcessed` on conflict.
    async fn insert_receipt(&mut self, receipt: ValueReceipt) -> ZapTrustResult<()>;

    /// Stage the new state of a target
    async fn save_target(&mut self, record: TargetRecord) -> ZapTrustResult<()>;

    /// Make every staged change visible at once
    async fn commit(self: Box<Self>) -> ZapTrustResult<()>;
}

/// Shared persistent store
#[async_trait]
pub trait ZapStore: TargetLookup {
    async fn begin(&self) -> ZapTrustResult<Box<dyn StoreTransaction>>;

    async fn receipt_by_event_id(&self, event_id: &str) -> ZapTrustResult<Option<ValueReceipt>>;

    /// Mirror a review, game or comment from the marketplace into the store.
    /// Registering an existing target is a no-op; signal changes go through a
    /// rescoring update instead.
    async fn register_target(&self, record: TargetRecord) -> ZapTrustResult<()>;
}

#[derive(Debug)]
struct StoreState {
    /// source event id -> receipt
    receipts: HashMap<String, ValueReceipt>,
    targets: HashMap<ZapTarget, TargetRecord>,
}

impl StoreState {
    fn new() -> Self {
        let mut targets = HashMap::new();
        targets.insert(ZapTarget::Platform, TargetRecord::platform());
        Self {
            receipts: HashMap::new(),
            targets,
        }
    }
}

/// In-memory store. A transaction owns the write lock until it commits or is
/// dropped, which serializes units of work like a serializable database
/// transaction would.
#[derive(Debug, Clone)]
pub struct MemoryZapStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryZapStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::new())),
        }
    }

    pub async fn receipt_count(&self) -> usize {
        self.state.read().await.receipts.len()
    }
}

impl Default for MemoryZapStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetLookup for MemoryZapStore {
    async fn target(&self, target: &ZapTarget) -> ZapTrustResult<Option<TargetRecord>> {
        Ok(self.state.read().await.targets.get(target).cloned())
    }
}

#[async_trait]
impl ZapStore for MemoryZapStore {
    async fn begin(&self) -> ZapTrustResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().write_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            staged_receipts: HashMap::new(),
            staged_targets: HashMap::new(),
        }))
    }

    async fn receipt_by_event_id(&self, event_id: &str) -> ZapTrustResult<Option<ValueReceipt>> {
        Ok(self.state.read().await.receipts.get(event_id).cloned())
    }

    async fn register_target(&self, record: TargetRecord) -> ZapTrustResult<()> {
        if record.target == ZapTarget::Platform {
            return Err(ZapTrustError::invalid_argument(
                "the platform target is built in and cannot be registered",
            ));
        }

        // Existing records keep their credited value
        let mut state = self.state.write().await;
        match state.targets.entry(record.target) {
            Entry::Occupied(existing) => {
                debug!(zap_target = %existing.key(), "Zap target already registered");
            }
            Entry::Vacant(slot) => {
                debug!(zap_target = %record.target, "Registered zap target");
                slot.insert(record);
            }
        }
        Ok(())
    }
}

struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<StoreState>,
    staged_receipts: HashMap<String, ValueReceipt>,
    staged_targets: HashMap<ZapTarget, TargetRecord>,
}

#[async_trait]
impl TargetLookup for MemoryTransaction {
    async fn target(&self, target: &ZapTarget) -> ZapTrustResult<Option<TargetRecord>> {
        Ok(self
            .staged_targets
            .get(target)
            .or_else(|| self.guard.targets.get(target))
            .cloned())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_receipt(&mut self, receipt: ValueReceipt) -> ZapTrustResult<()> {
        let key = receipt.source_event_id.clone();
        if self.guard.receipts.contains_key(&key) || self.staged_receipts.contains_key(&key) {
            return Err(ZapTrustError::already_processed(key));
        }

        self.staged_receipts.insert(key, receipt);
        Ok(())
    }

    async fn save_target(&mut self, record: TargetRecord) -> ZapTrustResult<()> {
        self.staged_targets.insert(record.target, record);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> ZapTrustResult<()> {
        let MemoryTransaction {
            mut guard,
            staged_receipts,
            staged_targets,
        } = *self;

        guard.receipts.extend(staged_receipts);
        guard.targets.extend(staged_targets);
        Ok(())
    }
}
