//! Multi-class weighted governance
//!
//! Voters are grouped into classes (direct, balance-weighted, quadratic,
//! capability-gated), each owning a fixed slice of the decision. A voter
//! splits their power across one or more options of a proposal; after the
//! voting window closes the best-scoring option wins if it clears quorum
//! and is strictly ahead, and the batch of calls bound to it is dispatched.

use async_trait::async_trait;

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod power;
pub mod proposals;
pub mod providers;
pub mod registry;
pub mod resolution;
pub mod snapshot;
pub mod types;
pub mod voting;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GovernanceConfig, GovernanceSettings};
pub use error::{ErrorKind, GovernanceError, GovernanceResult};
pub use events::GovernanceEvent;
pub use manager::{Collaborators, GovernanceManager};
pub use proposals::ProposalRequest;
pub use providers::{
    ActionDispatcher, BalanceOracle, CapabilityProvider, InMemoryBalances, InMemoryCapabilities,
    RecordingDispatcher,
};
pub use registry::ClassRegistry;
pub use resolution::{ExecutionStatus, Resolution, WinnerDecision};
pub use snapshot::GovernanceSnapshot;
pub use types::{
    AccountId, AssetId, Call, CapabilityId, ClassConfig, Proposal, ProposalId, ProposalOption,
    VotingStrategy,
};
pub use voting::{Ballot, VoteReceipt};

/// Core governance operations
#[async_trait]
pub trait Governance: Send + Sync {
    /// Current configuration
    async fn get_config(&self) -> GovernanceConfig;

    /// Replace the class configuration; returns its content hash
    async fn set_classes(&self, caller: &AccountId, classes: Vec<ClassConfig>) -> GovernanceResult<String>;

    /// Open a new proposal
    async fn create_proposal(&self, caller: &AccountId, request: ProposalRequest) -> GovernanceResult<ProposalId>;

    /// Get a proposal by id
    async fn get_proposal(&self, proposal_id: ProposalId) -> GovernanceResult<Proposal>;

    /// Cast a ballot on an open proposal
    async fn vote(&self, caller: &AccountId, proposal_id: ProposalId, ballot: Ballot) -> GovernanceResult<VoteReceipt>;

    /// Resolve a closed proposal; repeated calls return the recorded result
    async fn announce_winner(&self, proposal_id: ProposalId) -> GovernanceResult<Resolution>;
}
