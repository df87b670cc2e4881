//! Result type for Polity

use crate::error::Error;

/// Result type for Polity
pub type Result<T> = std::result::Result<T, Error>;
