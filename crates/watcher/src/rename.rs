//! Rename correlation
//!
//! Platforms report a rename as two halves: the old name departing and the
//! new name arriving, tied together by a tracker id. A move across the
//! watched root only ever produces one half. The correlator pairs halves that
//! belong together and resolves the rest: an arrival with nothing departed is
//! a creation, and a departure that stays unpaired for the window is a
//! deletion.

use crate::events::FileEvent;
use crate::source::SourceEvent;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, trace};

/// How long a departed name waits for its arrival half
pub(crate) const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug)]
enum PendingRename {
    /// Old name seen, new name not yet
    Departed(PathBuf),
    /// Both halves seen; a combined notification may still follow
    Paired,
}

/// Pairs rename halves by tracker id
pub(crate) struct RenameCorrelator {
    window: Duration,
    pending: Arc<DashMap<usize, PendingRename>>,
    sink: mpsc::Sender<SourceEvent>,
    runtime: Handle,
}

impl RenameCorrelator {
    pub fn new(window: Duration, sink: mpsc::Sender<SourceEvent>, runtime: Handle) -> Self {
        Self {
            window,
            pending: Arc::new(DashMap::new()),
            sink,
            runtime,
        }
    }

    /// The old name of a rename went away
    ///
    /// Without a tracker nothing can arrive to pair with it, so the file is
    /// gone right away. Otherwise the deletion is delivered later through the
    /// sink if no arrival claims it.
    pub fn departed(&self, tracker: Option<usize>, path: PathBuf) -> Option<FileEvent> {
        let Some(tracker) = tracker else {
            return Some(FileEvent::deleted(path));
        };

        trace!("Holding departed {:?} for tracker {}", path, tracker);
        self.pending.insert(tracker, PendingRename::Departed(path));

        let pending = Arc::clone(&self.pending);
        let sink = self.sink.clone();
        let window = self.window;
        self.runtime.spawn(async move {
            sleep(window).await;

            if let Some((_, PendingRename::Departed(path))) = pending.remove(&tracker) {
                debug!("No arrival for {:?} within {:?}; treating it as deleted", path, window);
                if let Err(e) = sink.try_send(SourceEvent::Change(FileEvent::deleted(path))) {
                    debug!("Dropping unpaired departure: {}", e);
                }
            }
        });

        None
    }

    /// The new name of a rename appeared
    pub fn arrived(&self, tracker: Option<usize>, path: PathBuf) -> Option<FileEvent> {
        let departed = tracker.and_then(|tracker| match self.pending.remove(&tracker) {
            Some((_, PendingRename::Departed(from))) => {
                self.pending.insert(tracker, PendingRename::Paired);
                Some(from)
            }
            Some((_, PendingRename::Paired)) | None => None,
        });

        Some(match departed {
            Some(from) => FileEvent::renamed(from, path),
            None => FileEvent::created(path),
        })
    }

    /// Both names reported together
    ///
    /// Skipped when the separate halves were already paired.
    pub fn paired(&self, tracker: Option<usize>, from: PathBuf, to: PathBuf) -> Option<FileEvent> {
        if let Some(tracker) = tracker {
            if let Some((_, PendingRename::Paired)) = self.pending.remove(&tracker) {
                trace!("Rename {:?} -> {:?} already reported", from, to);
                return None;
            }
        }

        Some(FileEvent::renamed(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn correlator(window_ms: u64) -> (RenameCorrelator, mpsc::Receiver<SourceEvent>) {
        let (tx, rx) = mpsc::channel(10);
        (
            RenameCorrelator::new(Duration::from_millis(window_ms), tx, Handle::current()),
            rx,
        )
    }

    #[tokio::test]
    async fn test_halves_with_same_tracker_pair_into_rename() {
        let (renames, mut rx) = correlator(30);

        assert_eq!(renames.departed(Some(7), "/w/old.txt".into()), None);
        assert_eq!(
            renames.arrived(Some(7), "/w/new.txt".into()),
            Some(FileEvent::renamed("/w/old.txt", "/w/new.txt"))
        );
        assert_eq!(
            renames.paired(Some(7), "/w/old.txt".into(), "/w/new.txt".into()),
            None
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_arrival_from_outside_is_a_creation() {
        let (renames, _rx) = correlator(30);

        assert_eq!(
            renames.arrived(Some(3), "/w/incoming.txt".into()),
            Some(FileEvent::created("/w/incoming.txt"))
        );
        assert_eq!(
            renames.arrived(None, "/w/other.txt".into()),
            Some(FileEvent::created("/w/other.txt"))
        );
    }

    #[tokio::test]
    async fn test_unpaired_departure_becomes_deletion_after_window() {
        let (renames, mut rx) = correlator(30);

        assert_eq!(renames.departed(Some(5), "/w/leaving.txt".into()), None);
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(
            rx.try_recv().ok(),
            Some(SourceEvent::Change(FileEvent::deleted("/w/leaving.txt")))
        );
    }

    #[tokio::test]
    async fn test_untracked_departure_is_deleted_immediately() {
        let (renames, _rx) = correlator(30);

        assert_eq!(
            renames.departed(None, "/w/leaving.txt".into()),
            Some(FileEvent::deleted("/w/leaving.txt"))
        );
    }

    #[tokio::test]
    async fn test_combined_notification_alone_is_a_rename() {
        let (renames, _rx) = correlator(30);

        assert_eq!(
            renames.paired(None, "/w/a.txt".into(), "/w/b.txt".into()),
            Some(FileEvent::renamed("/w/a.txt", "/w/b.txt"))
        );
        assert_eq!(renames.departed(Some(9), "/w/c.txt".into()), None);
        assert_eq!(
            renames.paired(Some(9), "/w/c.txt".into(), "/w/d.txt".into()),
            Some(FileEvent::renamed("/w/c.txt", "/w/d.txt"))
        );
    }
}
