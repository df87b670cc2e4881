//! Observable governance events

use serde::{Deserialize, Serialize};

use crate::resolution::ExecutionStatus;
use crate::types::{AccountId, CapabilityId, ProposalId};

/// Event emitted after a successful state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceEvent {
    /// Class configuration replaced
    ClassesUpdated {
        /// New configuration version
        version: u64,
        /// Content hash of the new class list
        hash: String,
    },
    /// Quorum changed
    QuorumUpdated {
        /// New configuration version
        version: u64,
        /// New quorum percentage
        quorum_pct: u8,
    },
    /// Allow-listed targets changed
    AllowListUpdated {
        /// New configuration version
        version: u64,
        /// Current allow-list
        targets: Vec<AccountId>,
    },
    /// Creator capabilities changed
    CreatorCapabilitiesUpdated {
        /// New configuration version
        version: u64,
        /// Current creator capabilities
        capabilities: Vec<CapabilityId>,
    },
    /// Dispatcher replaced
    DispatcherReassigned,
    /// Proposal created
    ProposalCreated {
        /// New proposal
        proposal_id: ProposalId,
        /// Creator
        creator: AccountId,
        /// Short title
        title: String,
        /// Close time (unix seconds)
        end_timestamp: u64,
        /// Number of options
        option_count: usize,
        /// Number of classes in the snapshot
        class_count: usize,
        /// Whether a poll gate applies
        restricted: bool,
    },
    /// Vote recorded
    VoteCast {
        /// Proposal voted on
        proposal_id: ProposalId,
        /// Voter
        voter: AccountId,
        /// Chosen options
        indices: Vec<usize>,
        /// Weights per chosen option
        weights: Vec<u32>,
        /// Raw power per class
        class_powers: Vec<u128>,
    },
    /// Proposal resolved
    WinnerAnnounced {
        /// Resolved proposal
        proposal_id: ProposalId,
        /// Winning option
        winner: Option<usize>,
        /// Whether the result is valid
        valid: bool,
        /// Whether the winning batch ran
        executed: bool,
        /// Batch outcome
        execution: ExecutionStatus,
    },
}
