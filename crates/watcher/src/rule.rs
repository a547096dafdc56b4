//! Processing rules
//!
//! A rule binds filters, a combination mode and an operation to a pipeline.
//! Rules are immutable once built by a [`RuleBuilder`](crate::RuleBuilder).

use crate::events::{FileEvent, FileOperation};
use crate::filter::FileFilter;
use crate::pipeline::Pipeline;
use dirflow_core::error::Result;
use dirflow_core::RuleLogic;
use std::fmt;
use std::sync::Arc;

/// How the filters of a rule are combined
///
/// With no filters at all, `And` matches every file (vacuous truth) while
/// `Or` matches none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleCondition {
    /// All filters must match
    #[default]
    And,
    /// At least one filter must match
    Or,
}

impl From<RuleLogic> for RuleCondition {
    fn from(logic: RuleLogic) -> Self {
        match logic {
            RuleLogic::And => Self::And,
            RuleLogic::Or => Self::Or,
        }
    }
}

/// Filters, combination mode and operation bound to one pipeline
pub struct ProcessingRule {
    filters: Vec<Arc<dyn FileFilter>>,
    condition: RuleCondition,
    operation: FileOperation,
    pipeline: Pipeline,
}

impl ProcessingRule {
    pub(crate) fn new(
        filters: Vec<Arc<dyn FileFilter>>,
        condition: RuleCondition,
        operation: FileOperation,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            filters,
            condition,
            operation,
            pipeline,
        }
    }

    pub fn operation(&self) -> FileOperation {
        self.operation
    }

    pub fn condition(&self) -> RuleCondition {
        self.condition
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn step_count(&self) -> usize {
        self.pipeline.len()
    }

    /// Whether `event` qualifies for this rule without running the pipeline
    ///
    /// The operation gate is checked first; `NotSpecified` never qualifies.
    pub fn qualifies(&self, event: &FileEvent) -> bool {
        if event.operation() == FileOperation::NotSpecified
            || event.operation() != self.operation
        {
            return false;
        }

        match self.condition {
            RuleCondition::And => self.filters.iter().all(|f| f.matches(event)),
            RuleCondition::Or => self.filters.iter().any(|f| f.matches(event)),
        }
    }

    /// Run the pipeline if `event` qualifies
    ///
    /// Returns `Ok(true)` when the pipeline ran to completion, `Ok(false)`
    /// when the event did not qualify, and the step error when a step failed.
    pub async fn try_process(&self, event: &FileEvent) -> Result<bool> {
        if !self.qualifies(event) {
            return Ok(false);
        }

        self.pipeline.execute(event).await?;
        Ok(true)
    }
}

impl fmt::Debug for ProcessingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingRule")
            .field("operation", &self.operation)
            .field("condition", &self.condition)
            .field("filters", &self.filters.len())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
