//! Shared setup for governance integration tests

#![allow(dead_code)]

use std::sync::Arc;

use polity_governance::{
    AccountId, ClassConfig, Collaborators, GovernanceConfig, GovernanceManager, InMemoryBalances,
    InMemoryCapabilities, ManualClock, RecordingDispatcher,
};

pub const START: u64 = 1_700_000_000;

pub struct TestEnv {
    pub manager: GovernanceManager,
    pub clock: Arc<ManualClock>,
    pub capabilities: Arc<InMemoryCapabilities>,
    pub balances: Arc<InMemoryBalances>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub governor: AccountId,
}

impl TestEnv {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            capabilities: self.capabilities.clone(),
            balances: self.balances.clone(),
            dispatcher: self.dispatcher.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Move the clock past the end of a proposal opened at `START` for `minutes`
    pub fn close(&self, minutes: u64) {
        self.clock.set(START + minutes * 60 + 1);
    }
}

pub fn setup_test_env(classes: Vec<ClassConfig>, quorum_pct: u8) -> TestEnv {
    let config = GovernanceConfig::new("governor", "polity", classes, quorum_pct)
        .expect("valid test config")
        .with_allowed_targets(["treasury", "registry"]);
    setup_with_config(config)
}

pub fn setup_with_config(config: GovernanceConfig) -> TestEnv {
    let clock = Arc::new(ManualClock::new(START));
    let capabilities = Arc::new(InMemoryCapabilities::new());
    let balances = Arc::new(InMemoryBalances::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let governor = config.governor.clone();

    let manager = GovernanceManager::new(
        config,
        Collaborators {
            capabilities: capabilities.clone(),
            balances: balances.clone(),
            dispatcher: dispatcher.clone(),
            clock: clock.clone(),
        },
    )
    .expect("valid manager");

    TestEnv {
        manager,
        clock,
        capabilities,
        balances,
        dispatcher,
        governor,
    }
}

pub fn account(name: &str) -> AccountId {
    AccountId::from(name)
}
