//! Re-entrant saga interpreter for non-atomic multi-transaction operations
//!
//! A saga is an ordered list of steps. Each step can tell whether its effect
//! already committed; committed steps are skipped, so re-running a saga after
//! a crash resumes from the first step that has not. A step's outcome is
//! persisted before the interpreter moves on.

use async_trait::async_trait;
use tracing::{info, Instrument};

use crate::error::Result;
use crate::metrics::metrics;
use crate::observability::TraceContext;
use crate::structured_logging::StructuredLogger;

#[async_trait]
pub trait SagaStep<C: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the step's effect is already on record
    ///
    /// May load the persisted outcome into `ctx` for later steps.
    async fn is_committed(&self, ctx: &mut C) -> Result<bool>;

    /// Checks that must hold before the effect runs
    async fn check_preconditions(&self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    /// The step's effect
    async fn execute(&self, ctx: &mut C, trace_ctx: &TraceContext) -> Result<()>;

    /// Durably record the outcome of `execute`
    async fn persist(&self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }
}

/// What one run of a saga did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SagaReport {
    pub executed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

pub struct Saga<C: Send> {
    steps: Vec<Box<dyn SagaStep<C>>>,
}

impl<C: Send> Saga<C> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn step(mut self, step: impl SagaStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every uncommitted step in order, stopping at the first error
    pub async fn run(&self, ctx: &mut C, trace_ctx: &TraceContext) -> Result<SagaReport> {
        let logger = StructuredLogger::new(trace_ctx);
        let mut report = SagaReport::default();

        for step in &self.steps {
            if step.is_committed(ctx).await? {
                metrics().saga_steps_skipped.inc();
                logger.log_step_skipped(step.name());
                report.skipped.push(step.name());
                continue;
            }

            step.check_preconditions(ctx).await?;

            let step_ctx = trace_ctx.child_span(step.name());
            let span = step_ctx.span();
            step.execute(ctx, &step_ctx).instrument(span).await?;
            step.persist(ctx).await?;

            info!(step = step.name(), correlation_id = %trace_ctx.correlation_id, "Saga step completed");
            report.executed.push(step.name());
        }

        Ok(report)
    }
}

impl<C: Send> Default for Saga<C> {
    fn default() -> Self {
        Self::new()
    }
}
