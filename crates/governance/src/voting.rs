//! Vote accumulation
//!
//! A vote is one state transition per (proposal, voter). Every check and
//! every accumulator update is computed on scratch copies first and only
//! written back once the whole ballot has been applied, so a failed vote
//! leaves the proposal untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GovernanceError, GovernanceResult};
use crate::power::{self, ACCUMULATOR_BITS};
use crate::providers::{BalanceOracle, CapabilityProvider};
use crate::types::{AccountId, Proposal, ProposalId};

/// A voter's distribution of power across options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Chosen option indices, pairwise distinct
    pub indices: Vec<usize>,
    /// Weight per chosen option, summing to 100
    pub weights: Vec<u32>,
}

impl Ballot {
    /// Create a ballot from parallel index and weight lists
    pub fn new(indices: Vec<usize>, weights: Vec<u32>) -> Self {
        Self { indices, weights }
    }

    /// All power to a single option
    pub fn single(index: usize) -> Self {
        Self::new(vec![index], vec![power::WEIGHT_TOTAL])
    }
}

/// Record of an accepted vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    /// Proposal voted on
    pub proposal_id: ProposalId,
    /// Voter
    pub voter: AccountId,
    /// Chosen option indices
    pub indices: Vec<usize>,
    /// Weights per chosen option
    pub weights: Vec<u32>,
    /// Raw power per class in snapshot order
    pub class_powers: Vec<u128>,
}

/// Collaborators consulted while computing voting power
pub struct PowerSources<'a> {
    /// Account that qualifies for every gated class
    pub privileged: &'a AccountId,
    /// Capability lookups
    pub capabilities: &'a dyn CapabilityProvider,
    /// Balance lookups
    pub balances: &'a dyn BalanceOracle,
}

/// Record `voter`'s ballot on `proposal` at time `now`
pub async fn cast_vote(
    proposal: &mut Proposal,
    voter: &AccountId,
    ballot: Ballot,
    now: u64,
    sources: &PowerSources<'_>,
) -> GovernanceResult<VoteReceipt> {
    if !proposal.is_open(now) {
        return Err(GovernanceError::ProposalClosed(proposal.id));
    }

    if proposal.restricted {
        let gate: Vec<_> = proposal.poll_gate.iter().cloned().collect();
        if !sources.capabilities.holds_any(voter, &gate).await? {
            return Err(GovernanceError::Unauthorized(format!(
                "{} lacks a capability required by proposal {}",
                voter, proposal.id
            )));
        }
    }

    if proposal.has_voted(voter) {
        return Err(GovernanceError::AlreadyVoted {
            proposal_id: proposal.id,
            voter: voter.clone(),
        });
    }

    power::validate_weights(&ballot.indices, &ballot.weights, proposal.options.len())?;

    let mut class_powers = Vec::with_capacity(proposal.class_count());
    for class in &proposal.classes_snapshot {
        class_powers.push(
            power::class_power(
                voter,
                class,
                sources.privileged,
                sources.capabilities,
                sources.balances,
            )
            .await?,
        );
    }

    apply_ballot(proposal, &class_powers, &ballot)?;
    proposal.voted.insert(voter.clone());

    debug!(
        "Recorded vote by {} on proposal {} with class powers {:?}",
        voter, proposal.id, class_powers
    );

    Ok(VoteReceipt {
        proposal_id: proposal.id,
        voter: voter.clone(),
        indices: ballot.indices,
        weights: ballot.weights,
        class_powers,
    })
}

/// Add one voter's class powers to the proposal's accumulators.
///
/// Class totals receive the full raw power; each chosen option receives
/// `floor(raw * weight / 100)` per class. Nothing is written on error.
pub fn accumulate(
    proposal: &mut Proposal,
    class_powers: &[u128],
    ballot: &Ballot,
) -> GovernanceResult<()> {
    power::validate_weights(&ballot.indices, &ballot.weights, proposal.options.len())?;
    apply_ballot(proposal, class_powers, ballot)
}

/// `accumulate` for a ballot whose weights are already validated
fn apply_ballot(
    proposal: &mut Proposal,
    class_powers: &[u128],
    ballot: &Ballot,
) -> GovernanceResult<()> {
    if class_powers.len() != proposal.class_count() {
        return Err(GovernanceError::InvalidVote(format!(
            "{} class powers for {} classes",
            class_powers.len(),
            proposal.class_count()
        )));
    }

    let mut totals = proposal.class_totals_raw.clone();
    for (total, &raw) in totals.iter_mut().zip(class_powers) {
        *total = checked_accumulate(*total, raw, "class total")?;
    }

    let mut updates: Vec<(usize, Vec<u128>)> = Vec::with_capacity(ballot.indices.len());
    for (&index, &weight) in ballot.indices.iter().zip(&ballot.weights) {
        let mut class_raw = proposal.options[index].class_raw.clone();
        let mut changed = false;
        for (slot, &raw) in class_raw.iter_mut().zip(class_powers) {
            if raw == 0 {
                continue;
            }
            let delta = power::weighted_share(raw, weight)?;
            if delta > 0 {
                *slot = checked_accumulate(*slot, delta, "option accumulator")?;
                changed = true;
            }
        }
        if changed {
            updates.push((index, class_raw));
        }
    }

    proposal.class_totals_raw = totals;
    for (index, class_raw) in updates {
        proposal.options[index].class_raw = class_raw;
    }
    Ok(())
}

fn checked_accumulate(current: u128, delta: u128, what: &str) -> GovernanceResult<u128> {
    let next = current.checked_add(delta).ok_or_else(|| {
        GovernanceError::ArithmeticOverflow(format!("{} overflowed u128", what))
    })?;
    power::check_fits(next, ACCUMULATOR_BITS)
        .map_err(|_| GovernanceError::ArithmeticOverflow(format!("{} exceeds {} bits", what, ACCUMULATOR_BITS)))?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GovernanceConfig;
    use crate::proposals::{build_proposal, ProposalRequest};
    use crate::providers::{InMemoryBalances, InMemoryCapabilities};
    use crate::resolution::determine_winner;
    use crate::types::{CapabilityId, ClassConfig};
    use proptest::prelude::*;

    fn proposal(classes: Vec<ClassConfig>, options: usize) -> Proposal {
        let config = GovernanceConfig::new("governor", "polity", classes, 50).unwrap();
        build_proposal(0, AccountId::from("creator"), 0, ProposalRequest::new("t", 10, options), &config)
            .unwrap()
    }

    #[test]
    fn test_accumulate_splits_by_weight() {
        let mut p = proposal(vec![ClassConfig::direct(100)], 2);
        accumulate(&mut p, &[100], &Ballot::new(vec![0, 1], vec![60, 40])).unwrap();
        accumulate(&mut p, &[100], &Ballot::single(0)).unwrap();

        assert_eq!(p.class_totals_raw, vec![200]);
        assert_eq!(p.options[0].class_raw, vec![160]);
        assert_eq!(p.options[1].class_raw, vec![40]);
    }

    #[test]
    fn test_accumulate_zero_power_class_is_noop() {
        let mut p = proposal(vec![ClassConfig::direct(60), ClassConfig::direct(40)], 2);
        accumulate(&mut p, &[100, 0], &Ballot::single(1)).unwrap();

        assert_eq!(p.class_totals_raw, vec![100, 0]);
        assert_eq!(p.options[1].class_raw, vec![100, 0]);
        assert_eq!(p.options[0].class_raw, vec![0, 0]);
    }

    #[test]
    fn test_accumulate_overflow_leaves_state_unchanged() {
        let mut p = proposal(vec![ClassConfig::direct(50), ClassConfig::direct(50)], 2);
        accumulate(&mut p, &[100, 100], &Ballot::single(0)).unwrap();
        let before = p.clone();

        let huge = 1u128 << ACCUMULATOR_BITS;
        let err = accumulate(&mut p, &[100, huge], &Ballot::new(vec![0, 1], vec![50, 50])).unwrap_err();
        assert!(matches!(err, GovernanceError::ArithmeticOverflow(_)));
        assert_eq!(p.class_totals_raw, before.class_totals_raw);
        assert_eq!(p.options, before.options);
    }

    #[tokio::test]
    async fn test_cast_vote_rules() {
        let caps = InMemoryCapabilities::new();
        let balances = InMemoryBalances::new();
        let governor = AccountId::from("governor");
        let sources = PowerSources {
            privileged: &governor,
            capabilities: &caps,
            balances: &balances,
        };
        let alice = AccountId::from("alice");

        let mut p = proposal(vec![ClassConfig::direct(100)], 2);
        let receipt = cast_vote(&mut p, &alice, Ballot::single(1), 0, &sources).await.unwrap();
        assert_eq!(receipt.class_powers, vec![100]);
        assert!(p.has_voted(&alice));

        let err = cast_vote(&mut p, &alice, Ballot::single(0), 0, &sources).await.unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyVoted { .. }));
        assert_eq!(p.options[0].class_raw, vec![0]);

        let bob = AccountId::from("bob");
        let err = cast_vote(&mut p, &bob, Ballot::new(vec![0], vec![90]), 0, &sources)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidVote(_)));
        assert!(!p.has_voted(&bob));

        let late = p.end_timestamp + 1;
        let err = cast_vote(&mut p, &bob, Ballot::single(0), late, &sources).await.unwrap_err();
        assert!(matches!(err, GovernanceError::ProposalClosed(0)));
    }

    #[tokio::test]
    async fn test_poll_gate() {
        let caps = InMemoryCapabilities::new();
        caps.grant("alice", "member");
        let balances = InMemoryBalances::new();
        let governor = AccountId::from("governor");
        let sources = PowerSources {
            privileged: &governor,
            capabilities: &caps,
            balances: &balances,
        };

        let mut p = proposal(vec![ClassConfig::direct(100)], 1);
        p.restricted = true;
        p.poll_gate.insert(CapabilityId::from("member"));

        let err = cast_vote(&mut p, &AccountId::from("bob"), Ballot::single(0), 0, &sources)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Unauthorized(_)));

        cast_vote(&mut p, &AccountId::from("alice"), Ballot::single(0), 0, &sources)
            .await
            .unwrap();
        assert_eq!(p.class_totals_raw, vec![100]);
    }

    fn slice_layouts() -> impl Strategy<Value = Vec<u8>> {
        prop::sample::select(vec![
            vec![100u8],
            vec![60, 40],
            vec![34, 33, 33],
            vec![10, 20, 30, 40],
            vec![5, 5, 10, 10, 15, 15, 20, 20],
        ])
    }

    fn layout_proposal(slices: &[u8], options: usize) -> Proposal {
        proposal(slices.iter().map(|&s| ClassConfig::direct(s)).collect(), options)
    }

    proptest! {
        #[test]
        fn prop_rejected_ballot_leaves_proposal_unchanged(
            options in 1usize..6,
            indices in prop::collection::vec(0usize..8, 0..5),
            weights in prop::collection::vec(0u32..120, 0..5),
            raw in 1u128..1_000_000,
        ) {
            prop_assume!(power::validate_weights(&indices, &weights, options).is_err());

            let mut p = layout_proposal(&[60, 40], options);
            accumulate(&mut p, &[raw, raw], &Ballot::single(0)).unwrap();
            let before = p.clone();

            let err = accumulate(&mut p, &[raw, raw], &Ballot::new(indices, weights)).unwrap_err();
            prop_assert!(matches!(err, GovernanceError::InvalidVote(_)));
            prop_assert_eq!(&p.class_totals_raw, &before.class_totals_raw);
            prop_assert_eq!(&p.options, &before.options);
        }

        #[test]
        fn prop_scores_stay_within_slices(
            slices in slice_layouts(),
            options in 2usize..6,
            voters in prop::collection::vec(
                (prop::collection::vec(0u128..10_000_000, 8), 0usize..6, 0usize..6, 0u32..=100),
                1..12,
            ),
            quorum in 1u8..=100,
        ) {
            let mut p = layout_proposal(&slices, options);
            for (powers, a, b, weight) in voters {
                let (a, b) = (a % options, b % options);
                let ballot = if a == b {
                    Ballot::single(a)
                } else {
                    Ballot::new(vec![a, b], vec![weight, 100 - weight])
                };
                accumulate(&mut p, &powers[..slices.len()], &ballot).unwrap();
            }

            let decision = determine_winner(&p, quorum).unwrap();
            prop_assert_eq!(decision.scores.len(), options);
            prop_assert!(decision.scores.iter().all(|&score| score <= 100));
            prop_assert!(decision.scores.iter().sum::<u32>() <= 100);
            prop_assert!(decision.hi <= 100);
            prop_assert!(decision.second <= decision.hi);
            if decision.valid {
                prop_assert!(decision.hi >= u32::from(quorum));
                prop_assert!(decision.hi > decision.second);
            }
        }
    }
}
