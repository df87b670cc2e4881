//! Core governance data model

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resolution::Resolution;

/// Sequential proposal identifier, starting at 0
pub type ProposalId = u64;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier
            pub fn new<S: Into<String>>(id: S) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string reference
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Account identifier (voters, creators, call targets)
    AccountId
);
string_id!(
    /// Externally issued capability identifier
    CapabilityId
);
string_id!(
    /// Reference to an external balance source
    AssetId
);

/// How a class derives a voter's raw power
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingStrategy {
    /// One qualifying account, one vote
    Direct,
    /// Power proportional to a balance, optionally square-rooted
    BalanceWeighted {
        /// Balance source
        asset: AssetId,
        /// Balances below this floor carry no power
        #[serde(default)]
        min_balance: u128,
        /// Apply the integer square root to the balance
        #[serde(default)]
        quadratic: bool,
    },
}

/// One voting class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Power source, written as a single-key map in YAML
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub strategy: VotingStrategy,
    /// Share of the combined score, 1..=100
    pub slice_pct: u8,
    /// Capabilities that qualify a voter; empty means ungated
    #[serde(default)]
    pub gate: Vec<CapabilityId>,
}

impl ClassConfig {
    /// Ungated one-account-one-vote class
    pub fn direct(slice_pct: u8) -> Self {
        Self {
            strategy: VotingStrategy::Direct,
            slice_pct,
            gate: Vec::new(),
        }
    }

    /// Ungated balance-weighted class
    pub fn balance_weighted(
        asset: impl Into<AssetId>,
        slice_pct: u8,
        min_balance: u128,
        quadratic: bool,
    ) -> Self {
        Self {
            strategy: VotingStrategy::BalanceWeighted {
                asset: asset.into(),
                min_balance,
                quadratic,
            },
            slice_pct,
            gate: Vec::new(),
        }
    }

    /// Restrict this class to holders of any of `gate`
    pub fn gated(mut self, gate: Vec<CapabilityId>) -> Self {
        self.gate = gate;
        self
    }

    /// Whether any account qualifies
    pub fn is_ungated(&self) -> bool {
        self.gate.is_empty()
    }
}

/// One external call in an action batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Account receiving the call
    pub target: AccountId,
    /// Value attached to the call
    #[serde(default)]
    pub value: u128,
    /// Opaque call data
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl Call {
    /// Create a new call
    pub fn new(target: impl Into<AccountId>, value: u128, payload: Vec<u8>) -> Self {
        Self {
            target: target.into(),
            value,
            payload,
        }
    }
}

/// One choice within a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalOption {
    /// Raw power received per class, indexed like the class snapshot
    pub class_raw: Vec<u128>,
    /// Calls dispatched if this option wins
    pub batch: Vec<Call>,
}

impl ProposalOption {
    pub(crate) fn new(class_count: usize, batch: Vec<Call>) -> Self {
        Self {
            class_raw: vec![0; class_count],
            batch,
        }
    }
}

/// A proposal and its running tally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Sequential identifier
    pub id: ProposalId,
    /// Short title
    pub title: String,
    /// Pointer to the full description
    pub description_ref: String,
    /// Account that created the proposal
    pub creator: AccountId,
    /// Creation time (unix seconds)
    pub created_at: u64,
    /// Voting closes once `now` is past this time (unix seconds)
    pub end_timestamp: u64,
    /// Class configuration frozen at creation
    pub classes_snapshot: Vec<ClassConfig>,
    /// Sum of every voter's raw power, per class
    pub class_totals_raw: Vec<u128>,
    /// Choices in index order
    pub options: Vec<ProposalOption>,
    /// Accounts that have voted
    pub voted: HashSet<AccountId>,
    /// Whether the poll-level gate applies
    pub restricted: bool,
    /// Poll-level capability gate
    pub poll_gate: HashSet<CapabilityId>,
    /// Outcome, recorded on first resolution
    pub resolution: Option<Resolution>,
}

impl Proposal {
    /// Whether votes are still accepted at `now`
    pub fn is_open(&self, now: u64) -> bool {
        now <= self.end_timestamp
    }

    /// Whether the voting window has ended at `now`
    pub fn is_closed(&self, now: u64) -> bool {
        now > self.end_timestamp
    }

    /// Whether `account` has voted
    pub fn has_voted(&self, account: &AccountId) -> bool {
        self.voted.contains(account)
    }

    /// Number of classes in the snapshot
    pub fn class_count(&self) -> usize {
        self.classes_snapshot.len()
    }
}
