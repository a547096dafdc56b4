//! Core types for the dirflow rule engine
//!
//! This crate provides the foundations shared by the engine and its front ends:
//!
//! - **Error handling**: the unified `Error` type and `Result` alias
//! - **Configuration**: engine settings and the declarative rule file
//!

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod error;

// Re-export main types for convenience
pub use config::{
    Config, DirectoryConfig, RuleConfig, RuleLogic, RuleOperation, StepConfig, WatcherSettings,
};
pub use error::{Error, Result, ResultExt};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, WatcherSettings};
    pub use crate::error::{Result, ResultExt};
}
