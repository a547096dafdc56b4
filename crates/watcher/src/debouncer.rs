//! Event debouncing
//!
//! Platforms frequently report the same change several times in quick
//! succession (a single save can yield multiple modify notifications). The
//! debouncer holds each `(path, operation)` pair for a short window and emits
//! it once, carrying the most recent event seen for that pair.

use crate::events::{DebouncedEvent, FileEvent, FileOperation};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, trace};

type PendingKey = (PathBuf, FileOperation);

/// Coalesces duplicate events within a fixed window
pub(crate) struct EventDebouncer {
    /// Debounce window duration
    debounce_duration: Duration,
    /// Events waiting for their window to close
    pending_events: Arc<DashMap<PendingKey, DebouncedEvent>>,
    /// Channel to send debounced events
    output_tx: mpsc::Sender<FileEvent>,
}

impl EventDebouncer {
    pub fn new(debounce_duration: Duration, output_tx: mpsc::Sender<FileEvent>) -> Self {
        Self {
            debounce_duration,
            pending_events: Arc::new(DashMap::new()),
            output_tx,
        }
    }

    /// Accept an event, scheduling its emission if it opens a new window
    pub fn process_event(&self, event: FileEvent) {
        let key = (event.path().to_path_buf(), event.operation());

        self.pending_events
            .entry(key.clone())
            .and_modify(|pending| {
                trace!("Coalescing {} event for {:?}", key.1, key.0);
                pending.update(event.clone());
            })
            .or_insert_with(|| {
                let pending_events = Arc::clone(&self.pending_events);
                let output_tx = self.output_tx.clone();
                let debounce_duration = self.debounce_duration;
                let key = key.clone();

                tokio::spawn(async move {
                    sleep(debounce_duration).await;

                    if let Some((_, pending)) = pending_events.remove(&key) {
                        debug!(
                            "Emitting debounced {} event for {:?} (aggregated {} times over {:?})",
                            key.1,
                            key.0,
                            pending.occurrence_count,
                            pending.age()
                        );
                        // the receiver is gone once the watcher stops
                        let _ = output_tx.send(pending.event).await;
                    }
                });

                DebouncedEvent::new(event.clone())
            });
    }
}
