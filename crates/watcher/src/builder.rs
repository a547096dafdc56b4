//! Fluent construction of rules and watchers
//!
//! [`RuleBuilder`] accumulates filters, a combination mode and steps for one
//! rule. [`WatcherBuilder`] collects rules for a single directory and
//! [`WatcherCompositor`] configures several directories at once, refusing to
//! register the same directory twice.

use crate::events::{FileEvent, FileOperation};
use crate::filter::{FileFilter, FileNameFilter};
use crate::pipeline::Pipeline;
use crate::rule::{ProcessingRule, RuleCondition};
use crate::source::{EventSource, NotifySource};
use crate::step::{DelegateStep, ProcessingStep};
use crate::watcher::FileWatcher;
use dirflow_core::error::{Error, Result};
use dirflow_core::WatcherSettings;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Accumulates filters and steps for one rule
///
/// The builder is consumed by [`build_for`](Self::build_for), so every rule
/// owns its own pipeline.
#[derive(Default)]
pub struct RuleBuilder {
    filters: Vec<Arc<dyn FileFilter>>,
    condition: RuleCondition,
    pipeline: Pipeline,
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file name pattern (`*` and `?` wildcards, case-insensitive)
    pub fn filter(self, pattern: impl Into<String>) -> Self {
        self.filter_with(FileNameFilter::new(pattern))
    }

    /// Add a custom filter
    pub fn filter_with(mut self, filter: impl FileFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Require every filter to match (the default)
    pub fn use_and_logic(mut self) -> Self {
        self.condition = RuleCondition::And;
        self
    }

    /// Require at least one filter to match
    pub fn use_or_logic(mut self) -> Self {
        self.condition = RuleCondition::Or;
        self
    }

    /// Append an async closure as a step
    pub fn add_step<F, Fut>(self, step: F) -> Self
    where
        F: Fn(FileEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_step_with(DelegateStep::new(step))
    }

    /// Append a custom step
    pub fn add_step_with(mut self, step: impl ProcessingStep + 'static) -> Self {
        self.pipeline.add_step(Arc::new(step));
        self
    }

    /// Freeze the accumulated configuration into a rule for `operation`
    ///
    /// Fails for [`FileOperation::NotSpecified`], which no event can match.
    /// A rule without filters is accepted with a warning.
    pub fn build_for(self, operation: FileOperation) -> Result<ProcessingRule> {
        if operation == FileOperation::NotSpecified {
            return Err(Error::config(
                "A rule must be built for an explicit operation",
            ));
        }

        if self.filters.is_empty() {
            match self.condition {
                RuleCondition::And => {
                    warn!("{operation} rule has no filters and will match every file")
                }
                RuleCondition::Or => {
                    warn!("{operation} rule has no filters and will never match")
                }
            }
        }

        debug!(
            "Built {} rule with {} filters and {} steps",
            operation,
            self.filters.len(),
            self.pipeline.len()
        );

        Ok(ProcessingRule::new(
            self.filters,
            self.condition,
            operation,
            self.pipeline,
        ))
    }
}

/// Collects rules for one directory
pub struct WatcherBuilder {
    path: PathBuf,
    settings: WatcherSettings,
    rules: Vec<ProcessingRule>,
    source: Option<Box<dyn EventSource>>,
    error: Option<Error>,
}

impl WatcherBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: WatcherSettings::default(),
            rules: Vec::new(),
            source: None,
            error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(mut self, settings: WatcherSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the platform notification source
    pub fn source(mut self, source: impl EventSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn when_created<F>(self, configure: F) -> Self
    where
        F: FnOnce(RuleBuilder) -> RuleBuilder,
    {
        self.rule(FileOperation::Created, configure)
    }

    pub fn when_changed<F>(self, configure: F) -> Self
    where
        F: FnOnce(RuleBuilder) -> RuleBuilder,
    {
        self.rule(FileOperation::Changed, configure)
    }

    pub fn when_deleted<F>(self, configure: F) -> Self
    where
        F: FnOnce(RuleBuilder) -> RuleBuilder,
    {
        self.rule(FileOperation::Deleted, configure)
    }

    pub fn when_renamed<F>(self, configure: F) -> Self
    where
        F: FnOnce(RuleBuilder) -> RuleBuilder,
    {
        self.rule(FileOperation::Renamed, configure)
    }

    /// Configure a rule for `operation` and append it
    ///
    /// A rule that cannot be built is reported by [`build`](Self::build).
    pub fn rule<F>(mut self, operation: FileOperation, configure: F) -> Self
    where
        F: FnOnce(RuleBuilder) -> RuleBuilder,
    {
        match configure(RuleBuilder::new()).build_for(operation) {
            Ok(rule) => self.rules.push(rule),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Append a rule built elsewhere
    pub fn add_rule(mut self, rule: ProcessingRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Create the watcher without starting it
    pub fn build(self) -> Result<FileWatcher> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let source: Box<dyn EventSource> = match self.source {
            Some(source) => source,
            None => Box::new(NotifySource::new()),
        };
        FileWatcher::with_source(self.path, self.rules, self.settings, source)
    }

    /// Create and start the watcher
    pub async fn start(self) -> Result<FileWatcher> {
        let mut watcher = self.build()?;
        watcher.start().await?;
        Ok(watcher)
    }
}

/// Configures watchers for several directories
#[derive(Default)]
pub struct WatcherCompositor {
    settings: WatcherSettings,
    builders: Vec<WatcherBuilder>,
    registered: Vec<PathBuf>,
}

impl WatcherCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `settings` for every directory registered afterwards
    pub fn with_settings(settings: WatcherSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Register rules for one directory
    ///
    /// Fails for a blank path or a path that was registered already.
    pub fn for_path<F>(&mut self, path: impl Into<PathBuf>, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(WatcherBuilder) -> WatcherBuilder,
    {
        let path = path.into();
        if path.to_string_lossy().trim().is_empty() {
            return Err(Error::invalid_input("Watched path must not be blank"));
        }

        let absolute = std::path::absolute(&path)?;
        if self.registered.contains(&absolute) {
            return Err(Error::duplicate_path(path));
        }

        let builder = configure(WatcherBuilder::new(path).settings(self.settings.clone()));
        self.registered.push(absolute);
        self.builders.push(builder);
        Ok(self)
    }

    /// Build every watcher, then start them all
    ///
    /// Nothing is started unless every watcher builds. If a start fails the
    /// watchers already started are stopped when they are dropped.
    pub async fn compose(self) -> Result<Vec<FileWatcher>> {
        let mut watchers = self
            .builders
            .into_iter()
            .map(WatcherBuilder::build)
            .collect::<Result<Vec<_>>>()?;

        for watcher in &mut watchers {
            watcher.start().await?;
        }

        Ok(watchers)
    }
}
