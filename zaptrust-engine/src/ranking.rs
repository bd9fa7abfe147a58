//! Ranking Engine - Trust-weighted content ranking
//!
//! Scores are a pure function of the target's verified value total, its trust
//! signals and its age at the reference time:
//!
//! ```text
//! trust = (1.0 + 0.2·verified_transaction + 0.3·identity_attested) · (0.5 if flagged)
//! decay = max(exp(-age_days / 30), 0.5)
//! score = ln(1 + value_total) · trust · decay
//! ```
//!
//! A score is always recomputed from scratch, never patched incrementally.

use crate::models::{RankingInput, RankingScore, TargetRecord};
use chrono::{DateTime, Utc};

pub const BASE_TRUST: f64 = 1.0;
pub const VERIFIED_TRANSACTION_BONUS: f64 = 0.2;
pub const IDENTITY_ATTESTED_BONUS: f64 = 0.3;
pub const SUSPICIOUS_PENALTY: f64 = 0.5;
/// e-folding time of the age decay
pub const DECAY_TIME_CONSTANT_DAYS: f64 = 30.0;
pub const DECAY_FLOOR: f64 = 0.5;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Computes ranking scores
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingEngine;

impl RankingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score one ranking input; `reference_time` defaults to now
    pub fn score(&self, input: &RankingInput) -> RankingScore {
        let reference_time = input.reference_time.unwrap_or_else(Utc::now);
        let age_days = age_in_days(input.content_created_at, reference_time);

        let magnitude = (input.value_total as f64).ln_1p();
        RankingScore::new(magnitude * trust_multiplier(input) * decay(age_days))
    }

    /// Score a stored target as of `reference_time`
    pub fn score_target(
        &self,
        record: &TargetRecord,
        reference_time: DateTime<Utc>,
    ) -> RankingScore {
        self.score(&ranking_input(record, reference_time))
    }
}

/// Build the ranking input for a stored target
pub fn ranking_input(record: &TargetRecord, reference_time: DateTime<Utc>) -> RankingInput {
    RankingInput {
        value_total: record.value_total,
        verified_transaction: record.signals.verified_transaction,
        identity_attested: record.signals.identity_attested,
        flagged_suspicious: record.signals.flagged_suspicious,
        content_created_at: record.content_created_at,
        reference_time: Some(reference_time),
    }
}

/// Additive bonuses first, then the multiplicative suspicion penalty
pub fn trust_multiplier(input: &RankingInput) -> f64 {
    let mut trust = BASE_TRUST;
    if input.verified_transaction {
        trust += VERIFIED_TRANSACTION_BONUS;
    }
    if input.identity_attested {
        trust += IDENTITY_ATTESTED_BONUS;
    }
    if input.flagged_suspicious {
        trust *= SUSPICIOUS_PENALTY;
    }
    trust
}

pub fn decay(age_days: f64) -> f64 {
    (-age_days / DECAY_TIME_CONSTANT_DAYS).exp().max(DECAY_FLOOR)
}

/// Fractional days between creation and reference; future content is age 0
fn age_in_days(created_at: DateTime<Utc>, reference_time: DateTime<Utc>) -> f64 {
    let millis = (reference_time - created_at).num_milliseconds().max(0);
    millis as f64 / MILLIS_PER_DAY
}
