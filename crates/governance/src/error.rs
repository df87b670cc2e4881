//! Error types for governance operations

use thiserror::Error;

use crate::types::{AccountId, ProposalId};

/// Broad category of a governance failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input
    Validation,
    /// Caller lacks the required role or capability
    Authorization,
    /// Operation not allowed in the proposal's current state
    State,
    /// Accumulator or power computation out of range
    Arithmetic,
    /// A bound batch could not be executed
    Dispatch,
    /// Collaborator, configuration or persistence failure
    Internal,
}

/// Error types for governance operations
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Class configuration violates the registry rules
    #[error("Invalid class configuration: {0}")]
    InvalidClassConfig(String),

    /// Proposal creation input is malformed
    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    /// Ballot is malformed
    #[error("Invalid vote: {0}")]
    InvalidVote(String),

    /// Governance parameter outside its allowed range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No proposal with this identifier
    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    /// Voting window has ended
    #[error("Proposal {0} is closed for voting")]
    ProposalClosed(ProposalId),

    /// Voting window has not ended yet
    #[error("Proposal {0} is still open")]
    ProposalStillOpen(ProposalId),

    /// Account already has a recorded vote
    #[error("Account {voter} has already voted on proposal {proposal_id}")]
    AlreadyVoted {
        /// Proposal voted on
        proposal_id: ProposalId,
        /// Repeat voter
        voter: AccountId,
    },

    /// Value does not fit the accumulator width
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// Dispatcher rejected a batch
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    /// Configuration loading or validation failed
    #[error("Configuration error: {0}")]
    Config(#[from] polity_common::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GovernanceError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::InvalidClassConfig(_)
            | GovernanceError::InvalidProposal(_)
            | GovernanceError::InvalidVote(_)
            | GovernanceError::InvalidParameter(_) => ErrorKind::Validation,
            GovernanceError::Unauthorized(_) => ErrorKind::Authorization,
            GovernanceError::ProposalNotFound(_)
            | GovernanceError::ProposalClosed(_)
            | GovernanceError::ProposalStillOpen(_)
            | GovernanceError::AlreadyVoted { .. } => ErrorKind::State,
            GovernanceError::ArithmeticOverflow(_) => ErrorKind::Arithmetic,
            GovernanceError::DispatchFailed(_) => ErrorKind::Dispatch,
            GovernanceError::Config(_)
            | GovernanceError::Serialization(_)
            | GovernanceError::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for GovernanceError {
    fn from(e: serde_json::Error) -> Self {
        GovernanceError::Serialization(e.to_string())
    }
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;
