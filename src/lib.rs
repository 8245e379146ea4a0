//! StageRunner - Staged Workflow Execution Engine
//!
//! An embeddable library for running workflows made of ordered stages, each
//! holding an ordered list of actions. Actions share a typed key-value store,
//! can grow the workflow while it runs, and can switch later stages and actions
//! off. Runs are sequential, fail fast, and honour cooperative cancellation.
//!
//! # Architecture
//!
//! The library is organized into these modules:
//!
//! - [`workflow`]: Workflow, Stage and Action definitions plus tag queries
//! - [`execution`]: The runner, per-action context and middleware
//! - [`store`]: Type-erased key-value store shared by a run
//! - [`cancel`]: Cancellation tokens with optional deadlines
//! - [`logger`]: Pluggable logging sink
//! - [`errors`]: Error types
//!
//! # Example
//!
//! ```rust
//! use stagerunner::{CancelToken, FnAction, Runner, Stage, Workflow};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut workflow = Workflow::new("greeting", "Greeting", "Builds a greeting");
//!
//!     let mut stage = Stage::new("build", "Build", "");
//!     stage.set_initial_data("name", "world".to_string());
//!     stage.add_action(FnAction::new("greet", "Greet", |ctx| {
//!         let name: String = ctx.store().get("name")?;
//!         ctx.store().put("greeting", format!("hello, {}", name));
//!         Ok(())
//!     }));
//!     workflow.add_stage(stage);
//!
//!     let runner = Runner::new();
//!     let logger = runner.logger().clone();
//!     runner.execute(&CancelToken::new(), &mut workflow, logger.as_ref())?;
//!
//!     let greeting: String = workflow.store().get("greeting")?;
//!     assert_eq!(greeting, "hello, world");
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod errors;
pub mod execution;
pub mod logger;
pub mod store;
pub mod workflow;

pub use execution::middleware;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use errors::{ActionError, CancelReason, RunError, StoreError};
pub use execution::{ActionContext, RunOptions, RunResult, Runner};
pub use logger::{default_logger, DefaultLogger, Logger, NullLogger};
pub use store::{MergeOptions, Store};
pub use workflow::{Action, BaseAction, FnAction, Stage, TagSet, Tagged, Workflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "StageRunner";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "StageRunner");
    }

    #[test]
    fn test_module_exports_stage() {
        let stage = Stage::new("test", "Test", "A stage");
        assert_eq!(stage.id, "test");
        assert!(stage.is_empty());
    }

    #[test]
    fn test_module_exports_workflow() {
        let workflow = Workflow::new("wf", "Workflow", "");
        assert!(workflow.is_empty());
        assert!(workflow.store().is_empty());
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
