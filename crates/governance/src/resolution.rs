//! Winner determination and conditional execution

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::proposals::first_disallowed_target;
use crate::providers::ActionDispatcher;
use crate::types::{AccountId, Proposal, ProposalId};

/// What happened to the winning option's batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// No valid winner, or the winner has no batch
    NotRequested,
    /// The dispatcher executed the batch
    Executed,
    /// A call target is no longer allow-listed; nothing was dispatched
    TargetNotAllowed(AccountId),
    /// The dispatcher rejected the batch
    Failed(String),
}

impl ExecutionStatus {
    /// Whether the batch ran
    pub fn executed(&self) -> bool {
        matches!(self, ExecutionStatus::Executed)
    }
}

/// Scores and winner of a closed proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerDecision {
    /// Highest-scoring option, lowest index on ties
    pub winner: Option<usize>,
    /// Quorum reached and the lead is strict
    pub valid: bool,
    /// Highest score
    pub hi: u32,
    /// Runner-up score
    pub second: u32,
    /// Combined score per option, 0..=100
    pub scores: Vec<u32>,
}

/// Terminal outcome recorded on a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Resolved proposal
    pub proposal_id: ProposalId,
    /// Winner and scores
    pub decision: WinnerDecision,
    /// Batch outcome
    pub execution: ExecutionStatus,
    /// Time of resolution (unix seconds)
    pub resolved_at: u64,
}

impl Resolution {
    /// Winning option, if any
    pub fn winner(&self) -> Option<usize> {
        self.decision.winner
    }

    /// Whether the result is valid
    pub fn valid(&self) -> bool {
        self.decision.valid
    }

    /// Whether the winning batch ran
    pub fn executed(&self) -> bool {
        self.execution.executed()
    }
}

/// Combined score of every option.
///
/// Each class with a non-zero total contributes
/// `floor(option_raw * slice / class_total)`; classes nobody voted in are
/// left out entirely. An option holding more than its class total is a
/// corrupted tally and is rejected.
pub fn option_scores(proposal: &Proposal) -> GovernanceResult<Vec<u32>> {
    proposal
        .options
        .iter()
        .enumerate()
        .map(|(index, option)| {
            let mut score: u32 = 0;
            for ((class, &total), &raw) in proposal
                .classes_snapshot
                .iter()
                .zip(&proposal.class_totals_raw)
                .zip(&option.class_raw)
            {
                if total == 0 {
                    continue;
                }
                if raw > total {
                    return Err(GovernanceError::ArithmeticOverflow(format!(
                        "option {} holds {} of a class total {}",
                        index, raw, total
                    )));
                }
                let share = raw
                    .checked_mul(u128::from(class.slice_pct))
                    .map(|product| product / total)
                    .ok_or_else(|| {
                        GovernanceError::ArithmeticOverflow(format!(
                            "option {} share {} at slice {} exceeds u128",
                            index, raw, class.slice_pct
                        ))
                    })?;
                // share <= slice_pct <= 100
                score += share as u32;
            }
            Ok(score)
        })
        .collect()
}

/// Pick the winner of `proposal` under `quorum_pct`
pub fn determine_winner(proposal: &Proposal, quorum_pct: u8) -> GovernanceResult<WinnerDecision> {
    if proposal.class_totals_raw.iter().all(|&total| total == 0) {
        return Ok(WinnerDecision {
            winner: None,
            valid: false,
            hi: 0,
            second: 0,
            scores: vec![0; proposal.options.len()],
        });
    }

    let scores = option_scores(proposal)?;

    let (mut hi, mut second, mut winner) = (0u32, 0u32, None);
    for (index, &score) in scores.iter().enumerate() {
        if score > hi {
            second = hi;
            hi = score;
            winner = Some(index);
        } else if score > second {
            second = score;
        }
    }

    let valid = winner.is_some() && hi >= u32::from(quorum_pct) && hi > second;

    Ok(WinnerDecision {
        winner,
        valid,
        hi,
        second,
        scores,
    })
}

/// Resolve a closed proposal, dispatching the winning batch at most once.
///
/// The allow-list is checked as it is now, not as it was at creation. A
/// proposal that already has a resolution returns it unchanged.
pub async fn announce_winner(
    proposal: &mut Proposal,
    now: u64,
    config: &GovernanceConfig,
    dispatcher: &dyn ActionDispatcher,
) -> GovernanceResult<Resolution> {
    if !proposal.is_closed(now) {
        return Err(GovernanceError::ProposalStillOpen(proposal.id));
    }
    if let Some(resolution) = &proposal.resolution {
        return Ok(resolution.clone());
    }

    let decision = determine_winner(proposal, config.quorum_pct)?;

    let execution = match decision.winner {
        Some(index) if decision.valid && !proposal.options[index].batch.is_empty() => {
            let batch = &proposal.options[index].batch;
            match first_disallowed_target(batch, config) {
                Some(target) => {
                    warn!(
                        "Proposal {} winner {} not executed: target {} is no longer allowed",
                        proposal.id, index, target
                    );
                    ExecutionStatus::TargetNotAllowed(target.clone())
                }
                None => match dispatcher.execute(proposal.id, batch).await {
                    Ok(()) => ExecutionStatus::Executed,
                    Err(e) => {
                        error!("Proposal {} batch failed: {}", proposal.id, e);
                        ExecutionStatus::Failed(e.to_string())
                    }
                },
            }
        }
        _ => ExecutionStatus::NotRequested,
    };

    info!(
        "Proposal {} resolved: winner {:?}, valid {}, hi {}, second {}, execution {:?}",
        proposal.id, decision.winner, decision.valid, decision.hi, decision.second, execution
    );

    let resolution = Resolution {
        proposal_id: proposal.id,
        decision,
        execution,
        resolved_at: now,
    };
    proposal.resolution = Some(resolution.clone());
    Ok(resolution)
}
