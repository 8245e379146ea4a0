//! Run Middleware
//!
//! A middleware wraps the whole-run executor. It receives the next executor
//! in the chain and returns a replacement with the same signature, so it can
//! run code before and after the rest of the run, skip it, or call it again.
//!
//! Middlewares are composed once per run. The first one registered is the
//! outermost layer; the stage loop is always the innermost.

use std::sync::Arc;
use std::time::Instant;

use crate::cancel::CancelToken;
use crate::errors::RunError;
use crate::logger::Logger;
use crate::workflow::Workflow;

/// Executor signature shared by the base stage loop and every middleware layer.
pub type RunnerFn =
    Arc<dyn Fn(&CancelToken, &mut Workflow, &dyn Logger) -> Result<(), RunError> + Send + Sync>;

/// Decorator over a [`RunnerFn`].
pub type Middleware = Arc<dyn Fn(RunnerFn) -> RunnerFn + Send + Sync>;

/// Wraps a closure as a [`RunnerFn`].
///
/// # Example
///
/// ```
/// use stagerunner::middleware::{runner_fn, RunnerFn};
///
/// let audit = |next: RunnerFn| -> RunnerFn {
///     runner_fn(move |cancel, workflow, logger| {
///         logger.info(format_args!("running '{}'", workflow.id));
///         next(cancel, workflow, logger)
///     })
/// };
/// # let _ = audit;
/// ```
pub fn runner_fn<F>(f: F) -> RunnerFn
where
    F: Fn(&CancelToken, &mut Workflow, &dyn Logger) -> Result<(), RunError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Folds `middlewares` around `base`, first element outermost.
pub fn compose(base: RunnerFn, middlewares: &[Middleware]) -> RunnerFn {
    middlewares
        .iter()
        .rev()
        .fold(base, |next, middleware| middleware(next))
}

/// Logs how long the wrapped run took and whether it succeeded.
pub fn timing() -> Middleware {
    Arc::new(|next: RunnerFn| -> RunnerFn {
        runner_fn(move |cancel, workflow, logger| {
            let start = Instant::now();
            let result = next(cancel, workflow, logger);
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => logger.info(format_args!(
                    "Workflow '{}' finished in {:.2?}",
                    workflow.id, elapsed
                )),
                Err(e) => logger.warn(format_args!(
                    "Workflow '{}' failed after {:.2?}: {}",
                    workflow.id, elapsed, e
                )),
            }
            result
        })
    })
}
