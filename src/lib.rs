//! Polity
//!
//! Multi-class weighted governance: proposals with several options, voters
//! grouped into classes that each own a slice of the decision, and
//! execution of the winning option's batch of calls.

/// Module version information
pub mod version {
    /// The current version of the Polity library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

pub use polity_common as common;
pub use polity_governance as governance;

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_available() {
        assert!(!super::version::VERSION.is_empty());
    }
}
