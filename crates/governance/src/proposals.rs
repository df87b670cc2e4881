//! Proposal creation
//!
//! Creating a proposal freezes the current class configuration into it, so
//! later configuration changes never affect a running tally.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::types::{AccountId, Call, CapabilityId, Proposal, ProposalId, ProposalOption};

/// Longest accepted title, in bytes
pub const MAX_TITLE_BYTES: usize = 256;
/// Fewest options per proposal
pub const MIN_OPTIONS: usize = 1;
/// Most options per proposal
pub const MAX_OPTIONS: usize = 50;
/// Shortest voting window, in minutes
pub const MIN_DURATION_MINUTES: u64 = 10;
/// Longest voting window, in minutes (30 days)
pub const MAX_DURATION_MINUTES: u64 = 43_200;
/// Most calls in one option's batch
pub const MAX_CALLS_PER_BATCH: usize = 20;

/// Input for creating a proposal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalRequest {
    /// Short title
    pub title: String,
    /// Pointer to the full description
    #[serde(default)]
    pub description_ref: String,
    /// Length of the voting window
    pub duration_minutes: u64,
    /// Number of options
    pub option_count: usize,
    /// One batch per option, if any option should trigger calls
    #[serde(default)]
    pub batches: Option<Vec<Vec<Call>>>,
    /// Poll-level gate; empty leaves the poll unrestricted
    #[serde(default)]
    pub poll_gate: Vec<CapabilityId>,
}

impl ProposalRequest {
    /// Plain request without batches or poll gate
    pub fn new(title: impl Into<String>, duration_minutes: u64, option_count: usize) -> Self {
        Self {
            title: title.into(),
            duration_minutes,
            option_count,
            ..Default::default()
        }
    }

    /// Attach a description reference
    pub fn with_description(mut self, description_ref: impl Into<String>) -> Self {
        self.description_ref = description_ref.into();
        self
    }

    /// Attach one batch per option
    pub fn with_batches(mut self, batches: Vec<Vec<Call>>) -> Self {
        self.batches = Some(batches);
        self
    }

    /// Restrict voting to holders of any of `gate`
    pub fn with_poll_gate(mut self, gate: Vec<CapabilityId>) -> Self {
        self.poll_gate = gate;
        self
    }
}

/// Check a creation request against the current configuration
pub fn validate_request(request: &ProposalRequest, config: &GovernanceConfig) -> GovernanceResult<()> {
    if request.title.is_empty() {
        return Err(GovernanceError::InvalidProposal("title cannot be empty".to_string()));
    }
    if request.title.len() > MAX_TITLE_BYTES {
        return Err(GovernanceError::InvalidProposal(format!(
            "title is {} bytes, limit is {}",
            request.title.len(),
            MAX_TITLE_BYTES
        )));
    }
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&request.option_count) {
        return Err(GovernanceError::InvalidProposal(format!(
            "option count {} outside {}..={}",
            request.option_count, MIN_OPTIONS, MAX_OPTIONS
        )));
    }
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&request.duration_minutes) {
        return Err(GovernanceError::InvalidProposal(format!(
            "duration {} minutes outside {}..={}",
            request.duration_minutes, MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
        )));
    }
    if config.classes.is_empty() {
        return Err(GovernanceError::InvalidProposal(
            "no voting classes configured".to_string(),
        ));
    }

    if let Some(batches) = &request.batches {
        if batches.len() != request.option_count {
            return Err(GovernanceError::InvalidProposal(format!(
                "{} batches for {} options",
                batches.len(),
                request.option_count
            )));
        }
        for (option, batch) in batches.iter().enumerate() {
            if batch.len() > MAX_CALLS_PER_BATCH {
                return Err(GovernanceError::InvalidProposal(format!(
                    "option {} batch has {} calls, limit is {}",
                    option,
                    batch.len(),
                    MAX_CALLS_PER_BATCH
                )));
            }
            if let Some(target) = first_disallowed_target(batch, config) {
                return Err(GovernanceError::InvalidProposal(format!(
                    "option {} calls disallowed target {}",
                    option, target
                )));
            }
        }
    }

    Ok(())
}

/// First call target that is not allow-listed or is the engine itself
pub fn first_disallowed_target<'a>(
    batch: &'a [Call],
    config: &GovernanceConfig,
) -> Option<&'a AccountId> {
    batch
        .iter()
        .map(|call| &call.target)
        .find(|target| **target == config.engine_account || !config.is_allowed_target(target))
}

/// Validate `request` and build proposal `id` with its class snapshot
pub fn build_proposal(
    id: ProposalId,
    creator: AccountId,
    now: u64,
    request: ProposalRequest,
    config: &GovernanceConfig,
) -> GovernanceResult<Proposal> {
    validate_request(&request, config)?;

    let classes_snapshot = config.classes.classes().to_vec();
    let class_count = classes_snapshot.len();

    let options = match request.batches {
        Some(batches) => batches
            .into_iter()
            .map(|batch| ProposalOption::new(class_count, batch))
            .collect(),
        None => (0..request.option_count)
            .map(|_| ProposalOption::new(class_count, Vec::new()))
            .collect(),
    };

    // duration is bounded by validate_request; the clock is not
    let end_timestamp = now
        .checked_add(request.duration_minutes * 60)
        .ok_or_else(|| {
            GovernanceError::InvalidProposal(format!(
                "a {} minute window starting at {} overflows the clock",
                request.duration_minutes, now
            ))
        })?;

    let poll_gate: HashSet<CapabilityId> = request.poll_gate.into_iter().collect();

    Ok(Proposal {
        id,
        title: request.title,
        description_ref: request.description_ref,
        creator,
        created_at: now,
        end_timestamp,
        classes_snapshot,
        class_totals_raw: vec![0; class_count],
        options,
        voted: HashSet::new(),
        restricted: !poll_gate.is_empty(),
        poll_gate,
        resolution: None,
    })
}
