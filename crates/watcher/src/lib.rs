#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Rule engine reacting to file system changes
//!
//! This crate binds declarative rules to watched directories:
//! - File name filters with `*`/`?` wildcards combined with AND/OR logic
//! - Per-operation rules (created, changed, deleted, renamed)
//! - Ordered async step pipelines run when a rule matches
//! - Optional debouncing of duplicate platform notifications
//!
//! # Example
//!
//! ```no_run
//! use dirflow_watcher::{LogStep, WatcherBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut watcher = WatcherBuilder::new("/srv/incoming")
//!     .when_created(|rule| {
//!         rule.filter("*.csv")
//!             .filter("*.txt")
//!             .use_or_logic()
//!             .add_step_with(LogStep)
//!     })
//!     .start()
//!     .await?;
//!
//! // ...
//! watcher.stop()?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod debouncer;
mod events;
mod filter;
mod pipeline;
mod rename;
mod rule;
mod source;
mod step;
mod watcher;

pub use builder::{RuleBuilder, WatcherBuilder, WatcherCompositor};
pub use dirflow_core::WatcherSettings;
pub use events::{FileEvent, FileOperation};
pub use filter::{FileFilter, FileNameFilter};
pub use pipeline::Pipeline;
pub use rule::{ProcessingRule, RuleCondition};
pub use source::{EventInjector, EventSource, ManualSource, NotifySource, SourceEvent};
pub use step::{CopyToStep, DelegateStep, DeleteStep, LogStep, MoveToStep, ProcessingStep};
pub use watcher::{DispatchSummary, FileWatcher, WatcherState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::{RuleBuilder, WatcherBuilder, WatcherCompositor};
    pub use crate::events::{FileEvent, FileOperation};
    pub use crate::watcher::FileWatcher;
    pub use dirflow_core::WatcherSettings;
}
