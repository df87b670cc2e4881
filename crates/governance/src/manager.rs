//! Governance manager
//!
//! Owns the live configuration and the proposal arena, wires in the
//! external collaborators and exposes every public operation. Each proposal
//! sits behind its own lock, so votes and resolution on one proposal are
//! serialized while different proposals proceed independently.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::events::GovernanceEvent;
use crate::proposals::{build_proposal, ProposalRequest};
use crate::providers::{ActionDispatcher, BalanceOracle, CapabilityProvider};
use crate::resolution::{self, Resolution};
use crate::snapshot::GovernanceSnapshot;
use crate::types::{AccountId, CapabilityId, ClassConfig, Proposal, ProposalId};
use crate::voting::{self, Ballot, PowerSources, VoteReceipt};
use crate::Governance;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// External collaborators the manager delegates to
#[derive(Clone)]
pub struct Collaborators {
    /// Capability lookups for gates and creator checks
    pub capabilities: Arc<dyn CapabilityProvider>,
    /// Balance lookups for balance-weighted classes
    pub balances: Arc<dyn BalanceOracle>,
    /// Executes winning batches
    pub dispatcher: Arc<dyn ActionDispatcher>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

type ProposalHandle = Arc<Mutex<Proposal>>;

/// The main implementation of the [`Governance`] trait
pub struct GovernanceManager {
    config: RwLock<GovernanceConfig>,
    proposals: RwLock<Vec<ProposalHandle>>,
    capabilities: Arc<dyn CapabilityProvider>,
    balances: Arc<dyn BalanceOracle>,
    dispatcher: RwLock<Arc<dyn ActionDispatcher>>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<GovernanceEvent>,
}

impl GovernanceManager {
    /// Create a manager with no proposals
    pub fn new(config: GovernanceConfig, collaborators: Collaborators) -> GovernanceResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, Vec::new(), collaborators))
    }

    /// Rebuild a manager from a snapshot
    pub fn restore(snapshot: GovernanceSnapshot, collaborators: Collaborators) -> GovernanceResult<Self> {
        snapshot.validate()?;
        info!(
            "Restoring governance state at config version {} with {} proposals",
            snapshot.config.version,
            snapshot.proposals.len()
        );
        Ok(Self::assemble(snapshot.config, snapshot.proposals, collaborators))
    }

    /// Load a snapshot file and rebuild a manager from it
    pub fn restore_from_file(path: impl AsRef<Path>, collaborators: Collaborators) -> GovernanceResult<Self> {
        Self::restore(GovernanceSnapshot::load(path)?, collaborators)
    }

    fn assemble(config: GovernanceConfig, proposals: Vec<Proposal>, collaborators: Collaborators) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: RwLock::new(config),
            proposals: RwLock::new(
                proposals
                    .into_iter()
                    .map(|p| Arc::new(Mutex::new(p)))
                    .collect(),
            ),
            capabilities: collaborators.capabilities,
            balances: collaborators.balances,
            dispatcher: RwLock::new(collaborators.dispatcher),
            clock: collaborators.clock,
            events,
        }
    }

    /// Receive events for every later state change
    pub fn subscribe(&self) -> broadcast::Receiver<GovernanceEvent> {
        self.events.subscribe()
    }

    /// Current class configuration
    pub async fn get_classes(&self) -> Vec<ClassConfig> {
        self.config.read().await.classes.classes().to_vec()
    }

    /// Number of proposals ever created
    pub async fn proposal_count(&self) -> u64 {
        self.proposals.read().await.len() as u64
    }

    /// Whether `account` has voted on `proposal_id`
    pub async fn has_voted(&self, proposal_id: ProposalId, account: &AccountId) -> GovernanceResult<bool> {
        let handle = self.proposal_handle(proposal_id).await?;
        let proposal = handle.lock().await;
        Ok(proposal.has_voted(account))
    }

    /// Raw per-class accumulators of one option
    pub async fn option_class_raw(&self, proposal_id: ProposalId, option: usize) -> GovernanceResult<Vec<u128>> {
        let handle = self.proposal_handle(proposal_id).await?;
        let proposal = handle.lock().await;
        proposal
            .options
            .get(option)
            .map(|o| o.class_raw.clone())
            .ok_or_else(|| {
                GovernanceError::InvalidParameter(format!(
                    "proposal {} has no option {}",
                    proposal_id, option
                ))
            })
    }

    /// Raw per-class totals of a proposal
    pub async fn class_totals_raw(&self, proposal_id: ProposalId) -> GovernanceResult<Vec<u128>> {
        let handle = self.proposal_handle(proposal_id).await?;
        let proposal = handle.lock().await;
        Ok(proposal.class_totals_raw.clone())
    }

    /// Recorded resolution, if the proposal has been resolved
    pub async fn resolution(&self, proposal_id: ProposalId) -> GovernanceResult<Option<Resolution>> {
        let handle = self.proposal_handle(proposal_id).await?;
        let proposal = handle.lock().await;
        Ok(proposal.resolution.clone())
    }

    /// Change the quorum percentage
    pub async fn set_quorum(&self, caller: &AccountId, quorum_pct: u8) -> GovernanceResult<()> {
        let (_, version) = self
            .update_config(caller, "set quorum", |next| {
                next.quorum_pct = quorum_pct;
                Ok(())
            })
            .await?;
        info!("Quorum set to {}% (config version {})", quorum_pct, version);
        self.emit(GovernanceEvent::QuorumUpdated { version, quorum_pct });
        Ok(())
    }

    /// Replace the allow-list of batch targets
    pub async fn set_allowed_targets(&self, caller: &AccountId, targets: Vec<AccountId>) -> GovernanceResult<()> {
        self.update_allow_list(caller, "set allowed targets", |next| {
            next.allowed_targets = targets.into_iter().collect();
        })
        .await
    }

    /// Allow batches to call `target`
    pub async fn add_allowed_target(&self, caller: &AccountId, target: AccountId) -> GovernanceResult<()> {
        self.update_allow_list(caller, "add allowed target", |next| {
            next.allowed_targets.insert(target);
        })
        .await
    }

    /// Stop allowing batches to call `target`
    pub async fn remove_allowed_target(&self, caller: &AccountId, target: &AccountId) -> GovernanceResult<()> {
        self.update_allow_list(caller, "remove allowed target", |next| {
            next.allowed_targets.remove(target);
        })
        .await
    }

    /// Replace the capabilities that allow creating proposals
    pub async fn set_creator_capabilities(
        &self,
        caller: &AccountId,
        capabilities: Vec<CapabilityId>,
    ) -> GovernanceResult<()> {
        let (_, version) = self
            .update_config(caller, "set creator capabilities", |next| {
                next.creator_capabilities = capabilities.clone();
                Ok(())
            })
            .await?;
        info!("Creator capabilities set to {:?} (config version {})", capabilities, version);
        self.emit(GovernanceEvent::CreatorCapabilitiesUpdated { version, capabilities });
        Ok(())
    }

    /// Replace the action dispatcher
    pub async fn set_dispatcher(
        &self,
        caller: &AccountId,
        dispatcher: Arc<dyn ActionDispatcher>,
    ) -> GovernanceResult<()> {
        {
            let config = self.config.read().await;
            Self::ensure_governor(&config, caller, "set dispatcher")?;
        }
        *self.dispatcher.write().await = dispatcher;
        info!("Action dispatcher reassigned by {}", caller);
        self.emit(GovernanceEvent::DispatcherReassigned);
        Ok(())
    }

    /// Copy of the full state
    pub async fn snapshot(&self) -> GovernanceSnapshot {
        let config = self.config.read().await.clone();
        let handles: Vec<ProposalHandle> = self.proposals.read().await.clone();
        let mut proposals = Vec::with_capacity(handles.len());
        for handle in handles {
            proposals.push(handle.lock().await.clone());
        }
        GovernanceSnapshot { config, proposals }
    }

    /// Write the full state to `path` as JSON
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> GovernanceResult<()> {
        let snapshot = self.snapshot().await;
        snapshot.save(path.as_ref())?;
        debug!(
            "Saved snapshot with {} proposals to {}",
            snapshot.proposals.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    async fn proposal_handle(&self, proposal_id: ProposalId) -> GovernanceResult<ProposalHandle> {
        let proposals = self.proposals.read().await;
        usize::try_from(proposal_id)
            .ok()
            .and_then(|index| proposals.get(index))
            .cloned()
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    fn ensure_governor(config: &GovernanceConfig, caller: &AccountId, action: &str) -> GovernanceResult<()> {
        if *caller != config.governor {
            warn!("Rejected {} from {}: not the governor", action, caller);
            return Err(GovernanceError::Unauthorized(format!(
                "only the governor may {}",
                action
            )));
        }
        Ok(())
    }

    async fn ensure_creator(&self, config: &GovernanceConfig, caller: &AccountId) -> GovernanceResult<()> {
        if *caller == config.governor {
            return Ok(());
        }
        if !config.creator_capabilities.is_empty()
            && self
                .capabilities
                .holds_any(caller, &config.creator_capabilities)
                .await?
        {
            return Ok(());
        }
        warn!("Rejected proposal creation by {}", caller);
        Err(GovernanceError::Unauthorized(format!(
            "{} may not create proposals",
            caller
        )))
    }

    /// Apply a governor change to a fresh copy of the configuration and
    /// swap it in only if the result validates.
    async fn update_config<T, F>(&self, caller: &AccountId, action: &str, mutate: F) -> GovernanceResult<(T, u64)>
    where
        F: FnOnce(&mut GovernanceConfig) -> GovernanceResult<T>,
    {
        let mut config = self.config.write().await;
        Self::ensure_governor(&config, caller, action)?;
        let mut next = config.next_version();
        let output = mutate(&mut next)?;
        next.validate()?;
        let version = next.version;
        *config = next;
        Ok((output, version))
    }

    async fn update_allow_list<F>(&self, caller: &AccountId, action: &str, mutate: F) -> GovernanceResult<()>
    where
        F: FnOnce(&mut GovernanceConfig),
    {
        let (targets, version) = self
            .update_config(caller, action, |next| {
                mutate(next);
                Ok(next.allowed_targets.iter().cloned().collect::<Vec<_>>())
            })
            .await?;
        info!("Allow-list now {:?} (config version {})", targets, version);
        self.emit(GovernanceEvent::AllowListUpdated { version, targets });
        Ok(())
    }

    fn emit(&self, event: GovernanceEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl Governance for GovernanceManager {
    async fn get_config(&self) -> GovernanceConfig {
        self.config.read().await.clone()
    }

    async fn set_classes(&self, caller: &AccountId, classes: Vec<ClassConfig>) -> GovernanceResult<String> {
        let (hash, version) = self
            .update_config(caller, "set classes", |next| next.classes.replace(classes))
            .await?;
        info!("Class configuration replaced (version {}, hash {})", version, hash);
        self.emit(GovernanceEvent::ClassesUpdated {
            version,
            hash: hash.clone(),
        });
        Ok(hash)
    }

    async fn create_proposal(&self, caller: &AccountId, request: ProposalRequest) -> GovernanceResult<ProposalId> {
        let config = self.config.read().await.clone();
        self.ensure_creator(&config, caller).await?;

        let now = self.clock.now();
        let mut proposals = self.proposals.write().await;
        let id = proposals.len() as ProposalId;
        let proposal = build_proposal(id, caller.clone(), now, request, &config)?;

        info!(
            "Created proposal {} '{}' by {} closing at {}",
            id, proposal.title, caller, proposal.end_timestamp
        );
        let event = GovernanceEvent::ProposalCreated {
            proposal_id: id,
            creator: caller.clone(),
            title: proposal.title.clone(),
            end_timestamp: proposal.end_timestamp,
            option_count: proposal.options.len(),
            class_count: proposal.class_count(),
            restricted: proposal.restricted,
        };
        proposals.push(Arc::new(Mutex::new(proposal)));
        drop(proposals);

        self.emit(event);
        Ok(id)
    }

    async fn get_proposal(&self, proposal_id: ProposalId) -> GovernanceResult<Proposal> {
        let handle = self.proposal_handle(proposal_id).await?;
        let proposal = handle.lock().await;
        Ok(proposal.clone())
    }

    async fn vote(&self, caller: &AccountId, proposal_id: ProposalId, ballot: Ballot) -> GovernanceResult<VoteReceipt> {
        let handle = self.proposal_handle(proposal_id).await?;
        let governor = self.config.read().await.governor.clone();
        let sources = PowerSources {
            privileged: &governor,
            capabilities: self.capabilities.as_ref(),
            balances: self.balances.as_ref(),
        };

        let mut proposal = handle.lock().await;
        let now = self.clock.now();
        let receipt = voting::cast_vote(&mut proposal, caller, ballot, now, &sources).await?;
        drop(proposal);

        info!("Vote by {} on proposal {} accepted", caller, proposal_id);
        self.emit(GovernanceEvent::VoteCast {
            proposal_id,
            voter: receipt.voter.clone(),
            indices: receipt.indices.clone(),
            weights: receipt.weights.clone(),
            class_powers: receipt.class_powers.clone(),
        });
        Ok(receipt)
    }

    async fn announce_winner(&self, proposal_id: ProposalId) -> GovernanceResult<Resolution> {
        let handle = self.proposal_handle(proposal_id).await?;
        let config = self.config.read().await.clone();
        let dispatcher = self.dispatcher.read().await.clone();

        let mut proposal = handle.lock().await;
        let first = proposal.resolution.is_none();
        let now = self.clock.now();
        let resolution =
            resolution::announce_winner(&mut proposal, now, &config, dispatcher.as_ref()).await?;
        drop(proposal);

        if first {
            self.emit(GovernanceEvent::WinnerAnnounced {
                proposal_id,
                winner: resolution.winner(),
                valid: resolution.valid(),
                executed: resolution.executed(),
                execution: resolution.execution.clone(),
            });
        }
        Ok(resolution)
    }
}
