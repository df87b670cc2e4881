//! Persisted governance state

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::power::{check_fits, ACCUMULATOR_BITS};
use crate::proposals::{MAX_OPTIONS, MIN_OPTIONS};
use crate::registry::validate_classes;
use crate::types::Proposal;

/// Full engine state: configuration and every proposal in id order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    /// Live configuration
    pub config: GovernanceConfig,
    /// Proposals; index equals proposal id
    pub proposals: Vec<Proposal>,
}

impl GovernanceSnapshot {
    /// Check that the snapshot can be restored
    pub fn validate(&self) -> GovernanceResult<()> {
        self.config.validate()?;
        for (index, proposal) in self.proposals.iter().enumerate() {
            if proposal.id != index as u64 {
                return Err(corrupt(format!(
                    "proposal at position {} has id {}",
                    index, proposal.id
                )));
            }
            check_proposal(proposal)?;
        }
        Ok(())
    }

    /// Write as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> GovernanceResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read and validate a snapshot file
    pub fn load(path: impl AsRef<Path>) -> GovernanceResult<Self> {
        let data = fs::read(path)?;
        let snapshot: Self = serde_json::from_slice(&data)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

fn corrupt(message: String) -> GovernanceError {
    GovernanceError::Serialization(message)
}

/// Structural and tally invariants of one stored proposal
fn check_proposal(proposal: &Proposal) -> GovernanceResult<()> {
    let id = proposal.id;
    validate_classes(&proposal.classes_snapshot)
        .map_err(|e| corrupt(format!("proposal {} class snapshot: {}", id, e)))?;

    let options = proposal.options.len();
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options) {
        return Err(corrupt(format!(
            "proposal {} has {} options, expected {} to {}",
            id, options, MIN_OPTIONS, MAX_OPTIONS
        )));
    }

    if proposal.end_timestamp < proposal.created_at {
        return Err(corrupt(format!("proposal {} ends before it was created", id)));
    }

    if proposal.restricted == proposal.poll_gate.is_empty() {
        return Err(corrupt(format!(
            "proposal {} restriction flag disagrees with its poll gate",
            id
        )));
    }

    let classes = proposal.class_count();
    if proposal.class_totals_raw.len() != classes
        || proposal.options.iter().any(|o| o.class_raw.len() != classes)
    {
        return Err(corrupt(format!(
            "proposal {} accumulators do not match its {} classes",
            id, classes
        )));
    }

    for (class, &total) in proposal.class_totals_raw.iter().enumerate() {
        check_fits(total, ACCUMULATOR_BITS)
            .map_err(|e| corrupt(format!("proposal {} class {} total: {}", id, class, e)))?;

        let received = proposal
            .options
            .iter()
            .try_fold(0u128, |sum, option| sum.checked_add(option.class_raw[class]));
        match received {
            Some(received) if received <= total => {}
            _ => {
                return Err(corrupt(format!(
                    "proposal {} class {} options hold more than the total {}",
                    id, class, total
                )))
            }
        }
    }

    Ok(())
}
