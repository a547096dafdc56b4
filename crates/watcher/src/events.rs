//! File change event types
//!
//! This module defines the immutable event delivered to rules for every
//! change observed under a watched directory.

use dirflow_core::RuleOperation;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Kind of file system change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FileOperation {
    /// No operation; never matched by any rule
    #[default]
    NotSpecified,
    /// File was created
    Created,
    /// File was modified
    Changed,
    /// File was deleted
    Deleted,
    /// File was renamed
    Renamed,
}

impl FileOperation {
    /// Name used in log records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSpecified => "NotSpecified",
            Self::Created => "Created",
            Self::Changed => "Changed",
            Self::Deleted => "Deleted",
            Self::Renamed => "Renamed",
        }
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RuleOperation> for FileOperation {
    fn from(operation: RuleOperation) -> Self {
        match operation {
            RuleOperation::Created => Self::Created,
            RuleOperation::Changed => Self::Changed,
            RuleOperation::Deleted => Self::Deleted,
            RuleOperation::Renamed => Self::Renamed,
        }
    }
}

/// A single change observed under a watched directory
///
/// `previous_path` is only ever set for [`FileOperation::Renamed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEvent {
    operation: FileOperation,
    path: PathBuf,
    previous_path: Option<PathBuf>,
}

impl FileEvent {
    /// Create an event for any non-rename operation
    pub fn new(operation: FileOperation, path: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            path: path.into(),
            previous_path: None,
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(FileOperation::Created, path)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(FileOperation::Changed, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(FileOperation::Deleted, path)
    }

    /// Create a rename event from `from` to `to`
    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            operation: FileOperation::Renamed,
            path: to.into(),
            previous_path: Some(from.into()),
        }
    }

    pub fn operation(&self) -> FileOperation {
        self.operation
    }

    /// Current path of the file (the new path for renames)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path before a rename
    pub fn previous_path(&self) -> Option<&Path> {
        self.previous_path.as_deref()
    }

    /// Last segment of `path`, or an empty string when the path has none
    pub fn file_name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or(Cow::Borrowed(""))
    }
}

/// Event with debounce metadata
#[derive(Debug, Clone)]
pub(crate) struct DebouncedEvent {
    /// The file change event
    pub event: FileEvent,
    /// When the event was first detected
    pub first_seen: Instant,
    /// Number of times this event was aggregated
    pub occurrence_count: u32,
}

impl DebouncedEvent {
    pub fn new(event: FileEvent) -> Self {
        Self {
            event,
            first_seen: Instant::now(),
            occurrence_count: 1,
        }
    }

    /// Record a duplicate occurrence, keeping the most recent event
    pub fn update(&mut self, event: FileEvent) {
        self.event = event;
        self.occurrence_count += 1;
    }

    /// Get the age of this event since first seen
    pub fn age(&self) -> Duration {
        self.first_seen.elapsed()
    }
}
