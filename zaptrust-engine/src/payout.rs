//! Payout Splitter - Remainder-exact developer/platform revenue split
//!
//! The platform takes 15% of a purchase, floored to the settlement
//! granularity of 1000 units (one satoshi in millisatoshis). The developer
//! receives everything else, so the two shares always sum to the total.

use crate::models::RevenueSplit;
use tracing::debug;

/// Platform fee in basis points (15%)
pub const PLATFORM_FEE_BPS: u64 = 1_500;
/// Smallest transferable amount of a platform fee
pub const SETTLEMENT_GRANULARITY: u64 = 1_000;

const BPS_DENOMINATOR: u128 = 10_000;

/// Splits purchase amounts between developer and platform
#[derive(Debug, Clone, Copy, Default)]
pub struct PayoutSplitter;

impl PayoutSplitter {
    pub fn new() -> Self {
        Self
    }

    /// Split a possibly negative total; negatives clamp to a zero split
    pub fn split(&self, total: i64) -> RevenueSplit {
        let total = total.max(0) as u64;
        self.split_amount(total)
    }

    /// Split a non-negative total
    pub fn split_amount(&self, total: u64) -> RevenueSplit {
        let platform_share = platform_fee(total);
        let developer_share = total - platform_share;

        debug!(total, developer_share, platform_share, "Computed revenue split");

        RevenueSplit {
            total,
            developer_share,
            platform_share,
        }
    }
}

/// floor(total * 0.15 / 1000) * 1000 in exact integer arithmetic
fn platform_fee(total: u64) -> u64 {
    let granularity = SETTLEMENT_GRANULARITY as u128;
    let units = (total as u128 * PLATFORM_FEE_BPS as u128) / (BPS_DENOMINATOR * granularity);
    // units * granularity <= total * 0.15, so it fits back into u64
    (units * granularity) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_splits() {
        let splitter = PayoutSplitter::new();
        let cases = [
            (100_000, 85_000, 15_000),
            (1_234_567, 1_049_567, 185_000),
            (1_000, 1_000, 0),
            (999, 999, 0),
            (0, 0, 0),
        ];

        for (total, developer, platform) in cases {
            let split = splitter.split(total);
            assert_eq!(split.total, total as u64);
            assert_eq!(split.developer_share, developer, "developer share of {}", total);
            assert_eq!(split.platform_share, platform, "platform share of {}", total);
        }
    }

    #[test]
    fn test_negative_total_clamps_to_zero() {
        let splitter = PayoutSplitter::new();
        for total in [-1, -1_000, i64::MIN] {
            let split = splitter.split(total);
            assert_eq!(
                split,
                RevenueSplit {
                    total: 0,
                    developer_share: 0,
                    platform_share: 0
                }
            );
        }
    }

    #[test]
    fn test_split_invariants() {
        let splitter = PayoutSplitter::new();
        let totals = (0..5_000u64)
            .map(|i| i * 997)
            .chain([6_666, 6_667, 13_333, 13_334, u64::MAX / 2, u64::MAX]);

        for total in totals {
            let split = splitter.split_amount(total);
            assert_eq!(split.developer_share + split.platform_share, total);
            assert_eq!(split.platform_share % SETTLEMENT_GRANULARITY, 0);
            // Never over-charges: platform share <= 15% of total
            assert!(split.platform_share as u128 * 10_000 <= total as u128 * 1_500);
        }
    }

    #[test]
    fn test_largest_signed_total() {
        let split = PayoutSplitter::new().split(i64::MAX);
        assert_eq!(split.developer_share + split.platform_share, i64::MAX as u64);
    }
}
