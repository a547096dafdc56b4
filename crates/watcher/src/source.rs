//! Change notification sources
//!
//! A source turns platform notifications into a single stream of tagged
//! [`SourceEvent`]s delivered to a watcher's dispatch loop. The
//! [`NotifySource`] is backed by the `notify` crate; [`ManualSource`] lets the
//! host push events itself.

use crate::events::FileEvent;
use crate::rename::{RenameCorrelator, RENAME_PAIR_WINDOW};
use dirflow_core::error::{Error, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{error, trace};

/// Message delivered by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A file changed
    Change(FileEvent),
    /// The source reported an internal failure (for example a queue overflow)
    Error(String),
}

/// Supplier of change notifications for one directory
pub trait EventSource: Send {
    /// Begin delivering events for `root` into `sink`
    fn enable(
        &mut self,
        root: &Path,
        recursive: bool,
        sink: mpsc::Sender<SourceEvent>,
    ) -> Result<()>;

    /// Stop delivering events. Safe to call repeatedly or before `enable`.
    fn disable(&mut self);
}

/// Source backed by the platform's recommended `notify` watcher
#[derive(Default)]
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
}

impl NotifySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSource for NotifySource {
    fn enable(
        &mut self,
        root: &Path,
        recursive: bool,
        sink: mpsc::Sender<SourceEvent>,
    ) -> Result<()> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::watcher(format!("File watching requires a Tokio runtime: {e}")))?;
        let renames = RenameCorrelator::new(RENAME_PAIR_WINDOW, sink.clone(), runtime);

        let handler = move |res: std::result::Result<NotifyEvent, notify::Error>| {
            for message in convert_notify_result(res, &renames) {
                if let Err(e) = sink.try_send(message) {
                    error!("Failed to send notify event: {}", e);
                }
            }
        };

        let mut watcher = RecommendedWatcher::new(handler, NotifyConfig::default())
            .map_err(|e| Error::watcher(format!("Failed to create watcher: {e}")))?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(root, mode)
            .map_err(|e| Error::watcher(format!("Failed to watch path {root:?}: {e}")))?;

        self.watcher = Some(watcher);
        Ok(())
    }

    fn disable(&mut self) {
        // dropping the watcher unsubscribes from the platform
        self.watcher.take();
    }
}

/// Convert one `notify` callback into zero or more source events
///
/// Rename halves go through `renames`, so a file moved into the root is
/// reported as created and one moved out as deleted.
fn convert_notify_result(
    res: std::result::Result<NotifyEvent, notify::Error>,
    renames: &RenameCorrelator,
) -> Vec<SourceEvent> {
    let event = match res {
        Ok(event) => event,
        Err(e) => return vec![SourceEvent::Error(format!("Notify error: {e}"))],
    };

    trace!("Received notify event: {:?}", event);

    let mut messages = Vec::new();
    if event.need_rescan() {
        messages.push(SourceEvent::Error(
            "Notification queue overflowed; some changes were missed".to_string(),
        ));
    }

    match event.kind {
        EventKind::Create(_) => {
            messages.extend(
                event
                    .paths
                    .into_iter()
                    .map(|p| SourceEvent::Change(FileEvent::created(p))),
            );
        }
        EventKind::Modify(ModifyKind::Name(mode)) => {
            let tracker = event.tracker();
            let mut paths = event.paths.into_iter();
            let resolved = match mode {
                RenameMode::Both => match (paths.next(), paths.next()) {
                    (Some(from), Some(to)) => renames.paired(tracker, from, to),
                    _ => None,
                },
                RenameMode::From => paths.next().and_then(|p| renames.departed(tracker, p)),
                RenameMode::To => paths.next().and_then(|p| renames.arrived(tracker, p)),
                // no direction given; what is still on disk arrived
                RenameMode::Any | RenameMode::Other => {
                    messages.extend(paths.map(|p| {
                        SourceEvent::Change(if p.exists() {
                            FileEvent::created(p)
                        } else {
                            FileEvent::deleted(p)
                        })
                    }));
                    None
                }
            };
            messages.extend(resolved.map(SourceEvent::Change));
        }
        EventKind::Modify(_) => {
            messages.extend(
                event
                    .paths
                    .into_iter()
                    .map(|p| SourceEvent::Change(FileEvent::changed(p))),
            );
        }
        EventKind::Remove(_) => {
            messages.extend(
                event
                    .paths
                    .into_iter()
                    .map(|p| SourceEvent::Change(FileEvent::deleted(p))),
            );
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }

    messages
}

type SharedSink = Arc<Mutex<Option<mpsc::Sender<SourceEvent>>>>;

/// Source whose events are pushed through an [`EventInjector`]
pub struct ManualSource {
    sink: SharedSink,
}

impl ManualSource {
    /// Create a source and the injector that feeds it
    pub fn new() -> (Self, EventInjector) {
        let sink: SharedSink = Arc::new(Mutex::new(None));
        (
            Self {
                sink: Arc::clone(&sink),
            },
            EventInjector { sink },
        )
    }
}

impl EventSource for ManualSource {
    fn enable(
        &mut self,
        _root: &Path,
        _recursive: bool,
        sink: mpsc::Sender<SourceEvent>,
    ) -> Result<()> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn disable(&mut self) {
        self.sink.lock().take();
    }
}

/// Handle for pushing events into a [`ManualSource`]
#[derive(Clone)]
pub struct EventInjector {
    sink: SharedSink,
}

impl EventInjector {
    /// Whether the owning watcher is currently accepting events
    pub fn is_enabled(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Deliver a change; returns `false` when delivery is disabled
    pub async fn send(&self, event: FileEvent) -> bool {
        self.deliver(SourceEvent::Change(event)).await
    }

    /// Deliver a source failure; returns `false` when delivery is disabled
    pub async fn send_error(&self, message: impl Into<String>) -> bool {
        self.deliver(SourceEvent::Error(message.into())).await
    }

    async fn deliver(&self, message: SourceEvent) -> bool {
        let sender = self.sink.lock().clone();
        match sender {
            Some(tx) => tx.send(message).await.is_ok(),
            None => false,
        }
    }
}
