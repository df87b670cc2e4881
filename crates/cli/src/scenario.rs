//! Scenario replay
//!
//! A scenario seeds in-memory balances and capabilities, then applies a
//! list of steps against a fresh engine driven by a manual clock. Step
//! failures are reported, not fatal.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use polity_common::{Configuration, Result as CommonResult};
use polity_governance::{
    AccountId, AssetId, Ballot, CapabilityId, ClassConfig, Clock, Collaborators, Governance,
    GovernanceManager, GovernanceResult, GovernanceSettings, InMemoryBalances,
    InMemoryCapabilities, ManualClock, ProposalId, ProposalRequest, RecordingDispatcher,
};

fn default_start_time() -> u64 {
    1_700_000_000
}

/// Balance seeded before the first step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSeed {
    pub asset: AssetId,
    pub account: AccountId,
    pub amount: u64,
}

/// Capability granted before the first step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySeed {
    pub account: AccountId,
    pub capability: CapabilityId,
}

/// One scenario action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Create {
        caller: AccountId,
        request: ProposalRequest,
    },
    Vote {
        caller: AccountId,
        proposal: ProposalId,
        indices: Vec<usize>,
        weights: Vec<u32>,
    },
    Advance {
        seconds: u64,
    },
    Resolve {
        proposal: ProposalId,
    },
    SetClasses {
        caller: AccountId,
        classes: Vec<ClassConfig>,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Create { .. } => "create",
            Step::Vote { .. } => "vote",
            Step::Advance { .. } => "advance",
            Step::Resolve { .. } => "resolve",
            Step::SetClasses { .. } => "set_classes",
        }
    }
}

/// Scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub settings: GovernanceSettings,
    #[serde(default = "default_start_time")]
    pub start_time: u64,
    #[serde(default)]
    pub balances: Vec<BalanceSeed>,
    #[serde(default)]
    pub capabilities: Vec<CapabilitySeed>,
    /// Make every dispatched batch fail
    #[serde(default)]
    pub failing_dispatcher: bool,
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

impl Configuration for Scenario {
    fn validate(&self) -> CommonResult<()> {
        self.settings.validate()
    }
}

/// Result of one step, printed as a JSON line
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub action: &'static str,
    pub now: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Finished replay
pub struct ScenarioRun {
    pub manager: GovernanceManager,
    pub outcomes: Vec<StepOutcome>,
}

/// Replay `scenario` against a fresh engine
pub async fn run(scenario: Scenario) -> Result<ScenarioRun> {
    let config = scenario.settings.into_config()?;

    let clock = Arc::new(ManualClock::new(scenario.start_time));
    let balances = Arc::new(InMemoryBalances::new());
    for seed in scenario.balances {
        balances.set_balance(seed.asset, seed.account, u128::from(seed.amount));
    }
    let capabilities = Arc::new(InMemoryCapabilities::new());
    for seed in scenario.capabilities {
        capabilities.grant(seed.account, seed.capability);
    }
    let dispatcher = Arc::new(RecordingDispatcher::new());
    dispatcher.set_failing(scenario.failing_dispatcher);

    let manager = GovernanceManager::new(
        config,
        Collaborators {
            capabilities,
            balances,
            dispatcher,
            clock: clock.clone(),
        },
    )?;

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.into_iter().enumerate() {
        let action = step.name();
        let result = apply(&manager, &clock, step).await;
        let now = clock.now();
        let outcome = match result {
            Ok(value) => {
                debug!("Step {} ({}) ok", index, action);
                StepOutcome { step: index, action, now, result: Some(value), error: None }
            }
            Err(e) => {
                warn!("Step {} ({}) failed: {}", index, action, e);
                StepOutcome { step: index, action, now, result: None, error: Some(e.to_string()) }
            }
        };
        outcomes.push(outcome);
    }

    Ok(ScenarioRun { manager, outcomes })
}

async fn apply(manager: &GovernanceManager, clock: &ManualClock, step: Step) -> GovernanceResult<Value> {
    match step {
        Step::Create { caller, request } => {
            let id = manager.create_proposal(&caller, request).await?;
            let proposal = manager.get_proposal(id).await?;
            Ok(json!({ "proposal_id": id, "end_timestamp": proposal.end_timestamp }))
        }
        Step::Vote { caller, proposal, indices, weights } => {
            let receipt = manager
                .vote(&caller, proposal, Ballot::new(indices, weights))
                .await?;
            Ok(serde_json::to_value(receipt)?)
        }
        Step::Advance { seconds } => {
            clock.advance(seconds);
            Ok(json!({ "advanced": seconds }))
        }
        Step::Resolve { proposal } => {
            let resolution = manager.announce_winner(proposal).await?;
            Ok(serde_json::to_value(resolution)?)
        }
        Step::SetClasses { caller, classes } => {
            let hash = manager.set_classes(&caller, classes).await?;
            Ok(json!({ "hash": hash }))
        }
    }
}
