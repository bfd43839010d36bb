//! Proportional distribution of an indivisible pool.
//!
//! Shares are computed as `floor(pool * weight / total_weight)` in 128-bit
//! intermediate arithmetic, so the allotted total never exceeds the pool and
//! the remainder (integer dust) stays with the vault. Weights of zero, and
//! weights small enough to floor to a zero share, receive nothing.

use covault_types::Address;
use std::collections::BTreeMap;

/// The result of splitting a pool across weighted recipients.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistributionOutcome {
    /// Non-zero shares, keyed by recipient.
    pub shares: BTreeMap<Address, u64>,
    /// Sum of all shares; at most the pool.
    pub distributed: u64,
}

/// Split `pool` proportionally to `weights`. Duplicate addresses have their
/// weights combined, saturating at `u64::MAX`. A zero total weight
/// distributes nothing.
pub fn distribute(pool: u64, weights: &[(Address, u64)]) -> DistributionOutcome {
    // Per-address weights stay in u64 so the share product below fits u128.
    let mut combined: BTreeMap<Address, u64> = BTreeMap::new();
    for (address, weight) in weights {
        let entry = combined.entry(*address).or_insert(0);
        *entry = entry.saturating_add(*weight);
    }

    let total_weight: u128 = combined.values().map(|w| *w as u128).sum();
    if total_weight == 0 || pool == 0 {
        return DistributionOutcome::default();
    }

    let mut outcome = DistributionOutcome::default();
    for (address, weight) in combined {
        // Fits in u64: share <= pool because weight <= total_weight.
        let share = ((pool as u128 * weight as u128) / total_weight) as u64;
        if share == 0 {
            continue;
        }
        outcome.shares.insert(address, share);
        outcome.distributed += share;
    }
    outcome
}
