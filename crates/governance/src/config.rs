//! Governance configuration
//!
//! [`GovernanceConfig`] is the live, governor-controlled state. It is never
//! patched in place: each change builds a full copy, validates it and swaps
//! it in with a bumped version. [`GovernanceSettings`] is its file form.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use polity_common::{Configuration, Error as CommonError, Result as CommonResult};

use crate::error::{GovernanceError, GovernanceResult};
use crate::registry::ClassRegistry;
use crate::types::{AccountId, CapabilityId, ClassConfig};

/// Smallest accepted quorum percentage
pub const MIN_QUORUM_PCT: u8 = 1;
/// Largest accepted quorum percentage
pub const MAX_QUORUM_PCT: u8 = 100;

/// Live governance configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Incremented on every accepted change
    pub version: u64,
    /// Sole principal allowed to change this configuration
    pub governor: AccountId,
    /// The engine's own account; batches may not call it
    pub engine_account: AccountId,
    /// Current class configuration
    pub classes: ClassRegistry,
    /// Minimum combined score for a valid winner
    pub quorum_pct: u8,
    /// Accounts that batches may call
    pub allowed_targets: BTreeSet<AccountId>,
    /// Capabilities that allow creating proposals
    pub creator_capabilities: Vec<CapabilityId>,
}

impl GovernanceConfig {
    /// Build and validate an initial configuration
    pub fn new(
        governor: impl Into<AccountId>,
        engine_account: impl Into<AccountId>,
        classes: Vec<ClassConfig>,
        quorum_pct: u8,
    ) -> GovernanceResult<Self> {
        let config = Self {
            version: 0,
            governor: governor.into(),
            engine_account: engine_account.into(),
            classes: ClassRegistry::init(classes)?,
            quorum_pct,
            allowed_targets: BTreeSet::new(),
            creator_capabilities: Vec::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builder: allow-listed targets
    pub fn with_allowed_targets<I, A>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AccountId>,
    {
        self.allowed_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: creator capabilities
    pub fn with_creator_capabilities<I, C>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CapabilityId>,
    {
        self.creator_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Check every invariant of the configuration
    pub fn validate(&self) -> GovernanceResult<()> {
        crate::registry::validate_classes(self.classes.classes())?;
        validate_quorum(self.quorum_pct)?;
        if self.governor.as_str().is_empty() {
            return Err(GovernanceError::InvalidParameter(
                "governor must be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `account` may be called by a batch
    pub fn is_allowed_target(&self, account: &AccountId) -> bool {
        self.allowed_targets.contains(account)
    }

    /// Copy of this configuration with the next version number
    pub(crate) fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next
    }
}

/// Check a quorum percentage
pub fn validate_quorum(quorum_pct: u8) -> GovernanceResult<()> {
    if !(MIN_QUORUM_PCT..=MAX_QUORUM_PCT).contains(&quorum_pct) {
        return Err(GovernanceError::InvalidParameter(format!(
            "quorum {} outside {}..={}",
            quorum_pct, MIN_QUORUM_PCT, MAX_QUORUM_PCT
        )));
    }
    Ok(())
}

/// File form of [`GovernanceConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceSettings {
    /// Governor principal
    pub governor: AccountId,
    /// The engine's own account
    pub engine_account: AccountId,
    /// Minimum combined score for a valid winner
    #[serde(default = "default_quorum_pct")]
    pub quorum_pct: u8,
    /// Initial class configuration
    pub classes: Vec<ClassConfig>,
    /// Accounts that batches may call
    #[serde(default)]
    pub allowed_targets: Vec<AccountId>,
    /// Capabilities that allow creating proposals
    #[serde(default)]
    pub creator_capabilities: Vec<CapabilityId>,
}

fn default_quorum_pct() -> u8 {
    50
}

impl GovernanceSettings {
    /// Read a settings file and build the live configuration from it
    pub fn load(path: impl AsRef<std::path::Path>) -> GovernanceResult<GovernanceConfig> {
        Self::from_file(path)?.into_config()
    }

    /// Build the live configuration at version 0
    pub fn into_config(self) -> GovernanceResult<GovernanceConfig> {
        Ok(GovernanceConfig::new(
            self.governor,
            self.engine_account,
            self.classes,
            self.quorum_pct,
        )?
        .with_allowed_targets(self.allowed_targets)
        .with_creator_capabilities(self.creator_capabilities))
    }
}

impl Configuration for GovernanceSettings {
    fn validate(&self) -> CommonResult<()> {
        crate::registry::validate_classes(&self.classes)
            .and_then(|_| validate_quorum(self.quorum_pct))
            .map_err(|e| CommonError::validation(e.to_string()))?;
        if self.governor.as_str().is_empty() {
            return Err(CommonError::validation("governor must be set"));
        }
        Ok(())
    }
}
