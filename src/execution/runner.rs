//! Workflow Runner
//!
//! The runner drives a complete workflow execution:
//! - Composes registered middleware around the stage loop
//! - Walks the stage list, skipping disabled stages
//! - Picks up stages appended by actions while the run is in progress
//! - Stops at the first failing stage or at cancellation
//!
//! Runs are strictly sequential: one action executes at a time, to completion.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::errors::RunError;
use crate::logger::{default_logger, Logger};
use crate::store::Store;
use crate::workflow::{Stage, Workflow};

use super::middleware::{compose, Middleware, RunnerFn};
use super::stage::{run_stage, StageSlot};

/// Per-run settings for [`Runner::execute_with_options`].
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Logger for this run; the runner's own logger when `None`.
    pub logger: Option<Arc<dyn Logger>>,
    /// Cancellation token checked before every stage and action.
    pub cancel: CancelToken,
    /// Entries merged into the workflow store before the run starts.
    pub initial_data: Store,
}

impl RunOptions {
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_initial_data<T>(self, key: impl Into<String>, value: T) -> Self
    where
        T: std::any::Any + Send + Sync,
    {
        self.initial_data.put(key, value);
        self
    }
}

/// Outcome of [`Runner::execute_with_options`].
#[derive(Debug)]
pub struct RunResult {
    pub workflow_id: String,
    pub success: bool,
    pub error: Option<RunError>,
    pub execution_time: Duration,
}

/// Workflow execution engine.
///
/// # Example
///
/// ```rust
/// use stagerunner::{CancelToken, FnAction, NullLogger, Runner, Stage, Workflow};
/// use stagerunner::middleware::timing;
///
/// let mut workflow = Workflow::new("pipeline", "Pipeline", "Uppercases its input");
/// workflow.store().put("input", vec!["a".to_string(), "b".to_string()]);
///
/// let mut stage = Stage::new("process", "Process", "");
/// stage.add_action(FnAction::new("upper", "Uppercase", |ctx| {
///     let items: Vec<String> = ctx.store().get("input")?;
///     let upper: Vec<String> = items.iter().map(|s| s.to_uppercase()).collect();
///     ctx.store().put("output", upper);
///     Ok(())
/// }));
/// workflow.add_stage(stage);
///
/// let runner = Runner::new().with_middleware(timing());
/// runner.execute(&CancelToken::new(), &mut workflow, &NullLogger).unwrap();
///
/// let output: Vec<String> = workflow.store().get("output").unwrap();
/// assert_eq!(output, vec!["A", "B"]);
/// ```
pub struct Runner {
    logger: Arc<dyn Logger>,
    middlewares: Vec<Middleware>,
}

impl Runner {
    /// Creates a runner using the shared default logger and no middleware.
    pub fn new() -> Self {
        Self {
            logger: default_logger(),
            middlewares: Vec::new(),
        }
    }

    /// Replaces the logger used when a run does not supply its own.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Registers a middleware; see [`Runner::use_middleware`].
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Registers a middleware. Earlier registrations wrap later ones.
    pub fn use_middleware<M>(&mut self, middleware: M)
    where
        M: Fn(RunnerFn) -> RunnerFn + Send + Sync + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Number of registered middlewares.
    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    /// Executes the workflow through the middleware chain.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every enabled stage completed
    /// * `Err` - An action failed, the run was cancelled, or a middleware failed
    pub fn execute(
        &self,
        cancel: &CancelToken,
        workflow: &mut Workflow,
        logger: &dyn Logger,
    ) -> Result<(), RunError> {
        let base: RunnerFn = Arc::new(run_workflow);
        let chain = compose(base, &self.middlewares);
        chain(cancel, workflow, logger)
    }

    /// Executes the workflow and reports the outcome as a [`RunResult`].
    pub fn execute_with_options(&self, workflow: &mut Workflow, options: RunOptions) -> RunResult {
        let logger = options.logger.unwrap_or_else(|| Arc::clone(&self.logger));

        if !options.initial_data.is_empty() {
            let merged = workflow.store().merge(&options.initial_data);
            logger.debug(format_args!(
                "Merged {} run option keys into workflow '{}'",
                merged, workflow.id
            ));
        }

        let start = Instant::now();
        let result = self.execute(&options.cancel, workflow, logger.as_ref());
        let execution_time = start.elapsed();

        RunResult {
            workflow_id: workflow.id.clone(),
            success: result.is_ok(),
            error: result.err(),
            execution_time,
        }
    }

    /// Executes a single stage against the workflow's store.
    ///
    /// The stage does not need to belong to the workflow. Actions it appends
    /// are run; stages it appends are added to the workflow but not executed.
    pub fn execute_stage(
        &self,
        cancel: &CancelToken,
        stage: &mut Stage,
        workflow: &mut Workflow,
        logger: &dyn Logger,
    ) -> Result<(), RunError> {
        run_stage(cancel, workflow, StageSlot::Detached(stage), logger)
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

/// Base executor: runs every enabled stage in order.
///
/// The stage count is re-read on every step so stages appended by actions
/// run after the stage that added them.
fn run_workflow(
    cancel: &CancelToken,
    workflow: &mut Workflow,
    logger: &dyn Logger,
) -> Result<(), RunError> {
    logger.info(format_args!(
        "Starting workflow '{}' ({} stages)",
        workflow.id,
        workflow.len()
    ));

    let mut index = 0;
    let mut executed = 0;

    while index < workflow.len() {
        let stage_id = workflow.stages()[index].id.clone();

        if let Err(reason) = cancel.check() {
            logger.warn(format_args!(
                "Workflow '{}' cancelled before stage '{}': {}",
                workflow.id, stage_id, reason
            ));
            return Err(RunError::Cancelled {
                workflow_id: workflow.id.clone(),
                checkpoint: format!("stage '{}'", stage_id),
                reason,
            });
        }

        if !workflow.is_stage_enabled(&stage_id) {
            logger.debug(format_args!("Skipping disabled stage '{}'", stage_id));
            index += 1;
            continue;
        }

        run_stage(cancel, workflow, StageSlot::Member(index), logger)?;
        executed += 1;
        index += 1;
    }

    logger.info(format_args!(
        "Workflow '{}' completed ({} of {} stages executed)",
        workflow.id,
        executed,
        workflow.len()
    ));
    Ok(())
}
