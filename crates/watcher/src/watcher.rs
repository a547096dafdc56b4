//! Directory watcher
//!
//! A [`FileWatcher`] binds an ordered list of rules to one directory. Events
//! from its [`EventSource`] arrive on a single channel and each one is
//! dispatched on its own task: rules are evaluated in registration order and
//! exactly one summary record is logged per event.

use crate::debouncer::EventDebouncer;
use crate::events::FileEvent;
use crate::rule::ProcessingRule;
use crate::source::{EventSource, NotifySource, SourceEvent};
use dirflow_core::error::{Error, Result, ResultExt};
use dirflow_core::WatcherSettings;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of a watcher; a stopped watcher cannot be restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Built but not yet receiving events
    Created,
    /// Receiving and dispatching events
    Running,
    /// Unsubscribed from its source
    Stopped,
}

/// Outcome of dispatching one event to every rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Rules whose pipeline ran to completion
    pub matched: usize,
    /// Rules whose pipeline failed part way
    pub failed: usize,
}

impl DispatchSummary {
    pub fn any_matched(&self) -> bool {
        self.matched > 0
    }
}

/// Rules and root shared with dispatch tasks
struct Dispatcher {
    root: PathBuf,
    rules: Vec<ProcessingRule>,
}

impl Dispatcher {
    async fn dispatch(&self, event: &FileEvent) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for (index, rule) in self.rules.iter().enumerate() {
            match rule.try_process(event).await {
                Ok(true) => summary.matched += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        rule = index,
                        operation = %event.operation(),
                        path = %event.path().display(),
                        "Rule {index} failed: {e}"
                    );
                }
            }
        }

        if summary.any_matched() {
            info!(
                operation = %event.operation(),
                path = %event.path().display(),
                root = %self.root.display(),
                matched = summary.matched,
                failed = summary.failed,
                "Event dispatched"
            );
        } else {
            debug!(
                operation = %event.operation(),
                path = %event.path().display(),
                root = %self.root.display(),
                matched = summary.matched,
                failed = summary.failed,
                "Event dispatched"
            );
        }

        summary
    }
}

fn spawn_dispatch(dispatcher: &Arc<Dispatcher>, event: FileEvent) {
    let dispatcher = Arc::clone(dispatcher);
    tokio::spawn(async move {
        dispatcher.dispatch(&event).await;
    });
}

/// Watches one directory and runs its rules against every change
pub struct FileWatcher {
    dispatcher: Arc<Dispatcher>,
    settings: WatcherSettings,
    source: Box<dyn EventSource>,
    state: WatcherState,
    cancellation_token: CancellationToken,
}

impl FileWatcher {
    /// Create a watcher backed by the platform notification source
    pub fn new(
        path: impl AsRef<Path>,
        rules: Vec<ProcessingRule>,
        settings: WatcherSettings,
    ) -> Result<Self> {
        Self::with_source(path, rules, settings, Box::new(NotifySource::new()))
    }

    /// Create a watcher fed by `source`
    ///
    /// A missing directory is created unless
    /// [`WatcherSettings::create_missing_dirs`] is disabled.
    pub fn with_source(
        path: impl AsRef<Path>,
        rules: Vec<ProcessingRule>,
        settings: WatcherSettings,
        source: Box<dyn EventSource>,
    ) -> Result<Self> {
        settings.validate()?;
        let root = prepare_root(path.as_ref(), &settings)?;

        if rules.is_empty() {
            warn!("No rules registered for {}", root.display());
        }

        Ok(Self {
            dispatcher: Arc::new(Dispatcher { root, rules }),
            settings,
            source,
            state: WatcherState::Created,
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Absolute path of the watched directory
    pub fn root(&self) -> &Path {
        &self.dispatcher.root
    }

    pub fn rules(&self) -> &[ProcessingRule] {
        &self.dispatcher.rules
    }

    pub fn settings(&self) -> &WatcherSettings {
        &self.settings
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == WatcherState::Running
    }

    /// Begin consuming events from the source
    ///
    /// Starting a running watcher is a no-op; starting a stopped one fails.
    pub async fn start(&mut self) -> Result<()> {
        match self.state {
            WatcherState::Running => {
                debug!("File watcher for {} already running", self.root().display());
                return Ok(());
            }
            WatcherState::Stopped => {
                return Err(Error::watcher(format!(
                    "File watcher for {} was stopped and cannot be restarted",
                    self.root().display()
                )));
            }
            WatcherState::Created => {}
        }

        info!(
            root = %self.root().display(),
            rules = self.dispatcher.rules.len(),
            "Starting file watcher"
        );

        let (source_tx, source_rx) = mpsc::channel(self.settings.channel_capacity);
        self.source
            .enable(&self.dispatcher.root, self.settings.recursive, source_tx)?;

        let debouncer = self.settings.debounce_duration().map(|window| {
            let (debounced_tx, debounced_rx) = mpsc::channel(self.settings.channel_capacity);
            self.start_debounced_processor(debounced_rx);
            EventDebouncer::new(window, debounced_tx)
        });

        self.start_event_processor(source_rx, debouncer);
        self.state = WatcherState::Running;

        info!(
            "Watching path: {:?} (recursive: {})",
            self.root(),
            self.settings.recursive
        );
        Ok(())
    }

    /// Dispatch `event` to every rule and log the outcome
    ///
    /// Rules run sequentially in registration order. This is what the event
    /// loop calls for each change; it is public so hosts can replay events.
    pub async fn dispatch(&self, event: &FileEvent) -> DispatchSummary {
        self.dispatcher.dispatch(event).await
    }

    /// Unsubscribe from the source
    ///
    /// Idempotent and safe to call without a prior `start`. Dispatches already
    /// in flight run to completion.
    pub fn stop(&mut self) -> Result<()> {
        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.state == WatcherState::Stopped {
            return;
        }

        self.cancellation_token.cancel();
        self.source.disable();
        self.state = WatcherState::Stopped;
        info!(root = %self.root().display(), "File watcher stopped");
    }

    fn start_event_processor(
        &self,
        mut source_rx: mpsc::Receiver<SourceEvent>,
        debouncer: Option<EventDebouncer>,
    ) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let cancel_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    message = source_rx.recv() => match message {
                        Some(SourceEvent::Change(event)) => match &debouncer {
                            Some(debouncer) => debouncer.process_event(event),
                            None => spawn_dispatch(&dispatcher, event),
                        },
                        Some(SourceEvent::Error(message)) => {
                            error!(root = %dispatcher.root.display(), "File watcher error: {message}");
                        }
                        None => break,
                    }
                }
            }
            debug!("Event processor for {} stopped", dispatcher.root.display());
        });
    }

    fn start_debounced_processor(&self, mut debounced_rx: mpsc::Receiver<FileEvent>) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let cancel_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    event = debounced_rx.recv() => match event {
                        Some(event) => spawn_dispatch(&dispatcher, event),
                        None => break,
                    }
                }
            }
        });
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.dispatcher.root)
            .field("rules", &self.dispatcher.rules.len())
            .field("state", &self.state)
            .finish()
    }
}

/// Resolve `path` to an absolute directory, creating it when allowed
fn prepare_root(path: &Path, settings: &WatcherSettings) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_input("Watched path must not be empty"));
    }

    let root = std::path::absolute(path)
        .context(format!("Failed to resolve {}", path.display()))?;

    if !root.exists() {
        if !settings.create_missing_dirs {
            return Err(Error::watcher(format!(
                "Directory {} does not exist",
                root.display()
            )));
        }
        warn!("Directory {} does not exist, creating it", root.display());
        std::fs::create_dir_all(&root)
            .context(format!("Failed to create {}", root.display()))?;
    } else if !root.is_dir() {
        return Err(Error::watcher(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    Ok(root)
}
