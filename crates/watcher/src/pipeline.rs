//! Ordered step execution
//!
//! Steps are appended while a rule is being configured and are read-only
//! once the rule is built, so execution needs no locking.

use crate::events::FileEvent;
use crate::step::ProcessingStep;
use dirflow_core::error::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Ordered list of steps run against a matched event
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn ProcessingStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step; duplicates are allowed
    pub fn add_step(&mut self, step: Arc<dyn ProcessingStep>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in insertion order
    ///
    /// Each step runs at most once. The first failure stops the pipeline and
    /// is returned as [`Error::Step`] carrying the zero-based step index.
    pub async fn execute(&self, event: &FileEvent) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            trace!("Running step {index} for {}", event.path().display());
            step.execute(event)
                .await
                .map_err(|e| Error::step(index, e))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::DelegateStep;
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn recording_step(log: &Arc<Mutex<Vec<usize>>>, id: usize, fail: bool) -> Arc<dyn ProcessingStep> {
        let log = Arc::clone(log);
        Arc::new(DelegateStep::new(move |_event: FileEvent| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(id);
                if fail {
                    Err(anyhow!("step {id} failed"))
                } else {
                    Ok(())
                }
            }
        }))
    }

    #[tokio::test]
    async fn test_steps_run_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        for id in 1..=3 {
            pipeline.add_step(recording_step(&log, id, false));
        }

        pipeline
            .execute(&FileEvent::created("/in/a.txt"))
            .await
            .expect("pipeline failed");

        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failure_stops_later_steps() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add_step(recording_step(&log, 1, false));
        pipeline.add_step(recording_step(&log, 2, true));
        pipeline.add_step(recording_step(&log, 3, false));

        let result = pipeline.execute(&FileEvent::created("/in/a.txt")).await;

        match result {
            Err(Error::Step { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(source.to_string(), "step 2 failed");
            }
            other => panic!("expected step failure, got {other:?}"),
        }
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_duplicate_steps_are_kept() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let step = recording_step(&log, 7, false);
        let mut pipeline = Pipeline::new();
        pipeline.add_step(Arc::clone(&step));
        pipeline.add_step(step);

        pipeline
            .execute(&FileEvent::deleted("/in/a.txt"))
            .await
            .expect("pipeline failed");

        assert_eq!(pipeline.len(), 2);
        assert_eq!(*log.lock(), vec![7, 7]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_succeeds() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        assert!(pipeline.execute(&FileEvent::created("/in/a.txt")).await.is_ok());
    }
}
