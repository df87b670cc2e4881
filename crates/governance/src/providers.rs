//! External collaborator seams
//!
//! The engine never issues capabilities, moves balances or executes calls
//! itself. It consults these traits instead. In-memory implementations are
//! provided for tests and scenario replay.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{GovernanceError, GovernanceResult};
use crate::types::{AccountId, AssetId, Call, CapabilityId, ProposalId};

/// Answers whether an account holds a capability
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Whether `account` holds `capability`
    async fn holds(&self, account: &AccountId, capability: &CapabilityId) -> GovernanceResult<bool>;

    /// Whether `account` holds at least one of `capabilities`
    async fn holds_any(
        &self,
        account: &AccountId,
        capabilities: &[CapabilityId],
    ) -> GovernanceResult<bool> {
        for capability in capabilities {
            if self.holds(account, capability).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Reports fungible balances
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Balance of `account` in `asset`
    async fn balance_of(&self, asset: &AssetId, account: &AccountId) -> GovernanceResult<u128>;
}

/// Executes the batch bound to a winning option
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Execute every call in order; any failure aborts the whole batch
    async fn execute(&self, proposal_id: ProposalId, batch: &[Call]) -> GovernanceResult<()>;
}

/// Capability registry held in memory
#[derive(Debug, Default)]
pub struct InMemoryCapabilities {
    grants: DashMap<AccountId, HashSet<CapabilityId>>,
}

impl InMemoryCapabilities {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `capability` to `account`
    pub fn grant(&self, account: impl Into<AccountId>, capability: impl Into<CapabilityId>) {
        self.grants
            .entry(account.into())
            .or_default()
            .insert(capability.into());
    }

    /// Revoke `capability` from `account`
    pub fn revoke(&self, account: &AccountId, capability: &CapabilityId) {
        if let Some(mut held) = self.grants.get_mut(account) {
            held.remove(capability);
        }
    }
}

#[async_trait]
impl CapabilityProvider for InMemoryCapabilities {
    async fn holds(&self, account: &AccountId, capability: &CapabilityId) -> GovernanceResult<bool> {
        Ok(self
            .grants
            .get(account)
            .map(|held| held.contains(capability))
            .unwrap_or(false))
    }
}

/// Balance table held in memory
#[derive(Debug, Default)]
pub struct InMemoryBalances {
    balances: DashMap<(AssetId, AccountId), u128>,
}

impl InMemoryBalances {
    /// Create an empty balance table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the balance of `account` in `asset`
    pub fn set_balance(&self, asset: impl Into<AssetId>, account: impl Into<AccountId>, amount: u128) {
        self.balances.insert((asset.into(), account.into()), amount);
    }
}

#[async_trait]
impl BalanceOracle for InMemoryBalances {
    async fn balance_of(&self, asset: &AssetId, account: &AccountId) -> GovernanceResult<u128> {
        Ok(self
            .balances
            .get(&(asset.clone(), account.clone()))
            .map(|amount| *amount)
            .unwrap_or(0))
    }
}

/// Dispatcher that records batches instead of executing them
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    executed: Mutex<Vec<(ProposalId, Vec<Call>)>>,
    failing: AtomicBool,
}

impl RecordingDispatcher {
    /// Create a dispatcher that accepts every batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent batches fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Batches executed so far, in order
    pub async fn executed(&self) -> Vec<(ProposalId, Vec<Call>)> {
        self.executed.lock().await.clone()
    }
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
    async fn execute(&self, proposal_id: ProposalId, batch: &[Call]) -> GovernanceResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            warn!("Rejecting batch of {} calls for proposal {}", batch.len(), proposal_id);
            return Err(GovernanceError::DispatchFailed(format!(
                "call to {} reverted",
                batch.first().map(|c| c.target.as_str()).unwrap_or("<empty>")
            )));
        }

        for call in batch {
            debug!("Proposal {} call -> {} (value {})", proposal_id, call.target, call.value);
        }
        info!("Executed batch of {} calls for proposal {}", batch.len(), proposal_id);

        self.executed.lock().await.push((proposal_id, batch.to_vec()));
        Ok(())
    }
}
