//! Workflow Execution Module
//!
//! Provides the engine that runs a workflow: the outer stage loop, the
//! inner action loop, the per-action context, and run middleware.
//!
//! # Architecture
//!
//! - [`runner`]: Runner orchestrating whole-workflow runs
//! - [`stage`]: Single stage execution logic
//! - [`context`]: Capability object handed to each action
//! - [`middleware`]: Decorators around the whole-run executor

pub mod context;
pub mod middleware;
pub mod runner;
pub(crate) mod stage;

pub use context::ActionContext;
pub use runner::{RunOptions, RunResult, Runner};
