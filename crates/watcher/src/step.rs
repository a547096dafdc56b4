//! Pipeline steps
//!
//! A step is an asynchronous unit of work run against a matched event. Steps
//! may have side effects and may fail; a failure stops the pipeline it
//! belongs to.

use crate::events::FileEvent;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Asynchronous unit of work executed when a rule matches
#[async_trait]
pub trait ProcessingStep: Send + Sync {
    /// Run the step against `event`
    async fn execute(&self, event: &FileEvent) -> anyhow::Result<()>;
}

type Handler = dyn Fn(FileEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// Step backed by an async closure
///
/// The closure receives its own copy of the event so the returned future
/// does not borrow from the pipeline.
pub struct DelegateStep {
    handler: Box<Handler>,
}

impl DelegateStep {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(FileEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            handler: Box::new(move |event| handler(event).boxed()),
        }
    }
}

#[async_trait]
impl ProcessingStep for DelegateStep {
    async fn execute(&self, event: &FileEvent) -> anyhow::Result<()> {
        (self.handler)(event.clone()).await
    }
}

/// Writes an informational record for every matched event
#[derive(Debug, Clone, Default)]
pub struct LogStep;

#[async_trait]
impl ProcessingStep for LogStep {
    async fn execute(&self, event: &FileEvent) -> anyhow::Result<()> {
        match event.previous_path() {
            Some(previous) => info!(
                operation = %event.operation(),
                path = %event.path().display(),
                previous_path = %previous.display(),
                "Matched {} -> {}",
                previous.display(),
                event.path().display()
            ),
            None => info!(
                operation = %event.operation(),
                path = %event.path().display(),
                "Matched {}",
                event.path().display()
            ),
        }
        Ok(())
    }
}

/// Copies the matched file into a destination directory
#[derive(Debug, Clone)]
pub struct CopyToStep {
    destination: PathBuf,
}

impl CopyToStep {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl ProcessingStep for CopyToStep {
    async fn execute(&self, event: &FileEvent) -> anyhow::Result<()> {
        let target = target_path(&self.destination, event).await?;
        tokio::fs::copy(event.path(), &target)
            .await
            .with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    event.path().display(),
                    target.display()
                )
            })?;
        debug!("Copied {} to {}", event.path().display(), target.display());
        Ok(())
    }
}

/// Moves the matched file into a destination directory
#[derive(Debug, Clone)]
pub struct MoveToStep {
    destination: PathBuf,
}

impl MoveToStep {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl ProcessingStep for MoveToStep {
    async fn execute(&self, event: &FileEvent) -> anyhow::Result<()> {
        let target = target_path(&self.destination, event).await?;

        if tokio::fs::rename(event.path(), &target).await.is_err() {
            // rename cannot cross file systems
            tokio::fs::copy(event.path(), &target)
                .await
                .with_context(|| {
                    format!(
                        "Failed to move {} to {}",
                        event.path().display(),
                        target.display()
                    )
                })?;
            tokio::fs::remove_file(event.path())
                .await
                .with_context(|| format!("Failed to remove {}", event.path().display()))?;
        }

        debug!("Moved {} to {}", event.path().display(), target.display());
        Ok(())
    }
}

/// Deletes the matched file
#[derive(Debug, Clone, Default)]
pub struct DeleteStep;

#[async_trait]
impl ProcessingStep for DeleteStep {
    async fn execute(&self, event: &FileEvent) -> anyhow::Result<()> {
        tokio::fs::remove_file(event.path())
            .await
            .with_context(|| format!("Failed to delete {}", event.path().display()))?;
        debug!("Deleted {}", event.path().display());
        Ok(())
    }
}

/// Resolve `destination/<file name>`, creating `destination` if needed
async fn target_path(destination: &Path, event: &FileEvent) -> anyhow::Result<PathBuf> {
    let file_name = event
        .path()
        .file_name()
        .ok_or_else(|| anyhow!("{} has no file name", event.path().display()))?;

    tokio::fs::create_dir_all(destination)
        .await
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    Ok(destination.join(file_name))
}
