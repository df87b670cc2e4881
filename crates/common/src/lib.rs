//! Common utilities and types shared by the Polity crates

pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use config::{Configuration, Environment};
pub use error::Error;
pub use result::Result;
