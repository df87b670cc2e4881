//! Voting power arithmetic
//!
//! Raw power is expressed in a fixed-point unit where [`SCALE`] is one full
//! vote, so that percentage splits stay integral.

use std::collections::HashSet;

use crate::error::{GovernanceError, GovernanceResult};
use crate::providers::{BalanceOracle, CapabilityProvider};
use crate::types::{AccountId, ClassConfig, VotingStrategy};

/// One full vote in raw power units
pub const SCALE: u128 = 100;

/// Ballot weights must sum to this
pub const WEIGHT_TOTAL: u32 = 100;

/// Representable width of per-option and per-class accumulators
pub const ACCUMULATOR_BITS: u32 = 96;

/// Raw power of `voter` in `class`.
///
/// Gated classes yield 0 unless the voter is `privileged` or holds one of the
/// gate capabilities. Balance-weighted classes yield 0 below `min_balance`.
pub async fn class_power(
    voter: &AccountId,
    class: &ClassConfig,
    privileged: &AccountId,
    capabilities: &dyn CapabilityProvider,
    balances: &dyn BalanceOracle,
) -> GovernanceResult<u128> {
    if !class.is_ungated()
        && voter != privileged
        && !capabilities.holds_any(voter, &class.gate).await?
    {
        return Ok(0);
    }

    match &class.strategy {
        VotingStrategy::Direct => Ok(SCALE),
        VotingStrategy::BalanceWeighted {
            asset,
            min_balance,
            quadratic,
        } => {
            let balance = balances.balance_of(asset, voter).await?;
            if balance < *min_balance {
                return Ok(0);
            }
            let base = if *quadratic {
                integer_sqrt(balance)
            } else {
                balance
            };
            base.checked_mul(SCALE).ok_or_else(|| {
                GovernanceError::ArithmeticOverflow(format!(
                    "power for balance {} exceeds u128",
                    balance
                ))
            })
        }
    }
}

/// Floor square root by Newton iteration; `integer_sqrt(0) == 0`
pub fn integer_sqrt(x: u128) -> u128 {
    // (x + 1) / 2 without overflowing at u128::MAX
    let mut z = x / 2 + (x & 1);
    let mut y = x;
    while z < y {
        y = z;
        z = (x / z + z) / 2;
    }
    y
}

/// Check a ballot's distribution against `option_count` options
pub fn validate_weights(
    indices: &[usize],
    weights: &[u32],
    option_count: usize,
) -> GovernanceResult<()> {
    if indices.is_empty() {
        return Err(GovernanceError::InvalidVote(
            "ballot must choose at least one option".to_string(),
        ));
    }
    if indices.len() != weights.len() {
        return Err(GovernanceError::InvalidVote(format!(
            "{} indices but {} weights",
            indices.len(),
            weights.len()
        )));
    }

    let mut seen = HashSet::with_capacity(indices.len());
    let mut sum: u64 = 0;
    for (&index, &weight) in indices.iter().zip(weights) {
        if index >= option_count {
            return Err(GovernanceError::InvalidVote(format!(
                "option index {} out of range (proposal has {} options)",
                index, option_count
            )));
        }
        if !seen.insert(index) {
            return Err(GovernanceError::InvalidVote(format!(
                "option index {} chosen twice",
                index
            )));
        }
        if weight > WEIGHT_TOTAL {
            return Err(GovernanceError::InvalidVote(format!(
                "weight {} exceeds {}",
                weight, WEIGHT_TOTAL
            )));
        }
        sum += u64::from(weight);
    }

    if sum != u64::from(WEIGHT_TOTAL) {
        return Err(GovernanceError::InvalidVote(format!(
            "weights sum to {}, expected {}",
            sum, WEIGHT_TOTAL
        )));
    }

    Ok(())
}

/// Fail if `value` needs more than `bits` bits
pub fn check_fits(value: u128, bits: u32) -> GovernanceResult<()> {
    if bits < u128::BITS && value >> bits != 0 {
        return Err(GovernanceError::ArithmeticOverflow(format!(
            "{} does not fit in {} bits",
            value, bits
        )));
    }
    Ok(())
}

/// `floor(raw * weight / WEIGHT_TOTAL)`
pub fn weighted_share(raw: u128, weight: u32) -> GovernanceResult<u128> {
    raw.checked_mul(u128::from(weight))
        .map(|product| product / u128::from(WEIGHT_TOTAL))
        .ok_or_else(|| {
            GovernanceError::ArithmeticOverflow(format!(
                "share of {} at weight {} exceeds u128",
                raw, weight
            ))
        })
}
