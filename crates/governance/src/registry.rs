//! Class configuration registry
//!
//! A configuration is replaced whole or not at all. Every accepted
//! configuration has 1..=8 classes whose slices sum to exactly 100.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GovernanceError, GovernanceResult};
use crate::types::{ClassConfig, VotingStrategy};

/// Maximum classes in one configuration
pub const MAX_CLASSES: usize = 8;

/// Required sum of all slices
pub const SLICE_TOTAL: u32 = 100;

/// Validated, ordered class configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassRegistry {
    classes: Vec<ClassConfig>,
}

impl ClassRegistry {
    /// Build the initial configuration
    pub fn init(initial: Vec<ClassConfig>) -> GovernanceResult<Self> {
        validate_classes(&initial)?;
        Ok(Self { classes: initial })
    }

    /// Replace the whole configuration, returning its content hash
    pub fn replace(&mut self, classes: Vec<ClassConfig>) -> GovernanceResult<String> {
        validate_classes(&classes)?;
        let hash = classes_hash(&classes)?;
        self.classes = classes;
        Ok(hash)
    }

    /// Current classes in order
    pub fn classes(&self) -> &[ClassConfig] {
        &self.classes
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no classes are configured
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Content hash of the current configuration
    pub fn hash(&self) -> GovernanceResult<String> {
        classes_hash(&self.classes)
    }
}

/// Check the structural rules of a class configuration
pub fn validate_classes(classes: &[ClassConfig]) -> GovernanceResult<()> {
    if classes.is_empty() || classes.len() > MAX_CLASSES {
        return Err(GovernanceError::InvalidClassConfig(format!(
            "expected 1 to {} classes, got {}",
            MAX_CLASSES,
            classes.len()
        )));
    }

    let mut sum: u32 = 0;
    for (i, class) in classes.iter().enumerate() {
        if class.slice_pct == 0 || u32::from(class.slice_pct) > SLICE_TOTAL {
            return Err(GovernanceError::InvalidClassConfig(format!(
                "class {} slice {} outside 1..=100",
                i, class.slice_pct
            )));
        }
        if let VotingStrategy::BalanceWeighted { asset, .. } = &class.strategy {
            if asset.as_str().is_empty() {
                return Err(GovernanceError::InvalidClassConfig(format!(
                    "balance-weighted class {} has no asset",
                    i
                )));
            }
        }
        sum += u32::from(class.slice_pct);
    }

    if sum != SLICE_TOTAL {
        return Err(GovernanceError::InvalidClassConfig(format!(
            "slices sum to {}, expected {}",
            sum, SLICE_TOTAL
        )));
    }

    Ok(())
}

/// Hex SHA-256 of the canonical JSON encoding of `classes`
pub fn classes_hash(classes: &[ClassConfig]) -> GovernanceResult<String> {
    let encoded = serde_json::to_vec(classes)?;
    Ok(hex::encode(Sha256::digest(&encoded)))
}
