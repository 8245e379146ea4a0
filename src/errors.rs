//! Error Types
//!
//! Errors raised by the store, by cancellation checks and by workflow runs.
//! Action failures are never recovered by the engine: they are wrapped with
//! the stage and action that produced them and returned to the caller.

use thiserror::Error;

/// Error type returned by [`Action::execute`](crate::Action::execute).
///
/// Any error type converts into it with `?`, including [`StoreError`].
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Failures when reading from a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("key not found: '{0}'")]
    KeyNotFound(String),

    #[error("type mismatch for key '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Why a [`CancelToken`](crate::CancelToken) reports itself as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelReason {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Terminal error of a workflow run.
#[derive(Debug, Error)]
pub enum RunError {
    /// An action returned an error; the run stopped at that action.
    #[error("action '{action_id}' ({action_name}) in stage '{stage_id}' failed: {source}")]
    ActionExecution {
        stage_id: String,
        action_id: String,
        action_name: String,
        #[source]
        source: ActionError,
    },

    /// The cancellation token was done at a stage or action boundary.
    #[error("workflow '{workflow_id}' cancelled before {checkpoint}: {reason}")]
    Cancelled {
        workflow_id: String,
        checkpoint: String,
        reason: CancelReason,
    },

    /// A middleware failed on its own account.
    #[error("middleware error: {0}")]
    Middleware(#[source] ActionError),
}

impl RunError {
    /// Returns true if the run was aborted by cancellation rather than by a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Id of the stage the error is attributed to, if any.
    pub fn stage_id(&self) -> Option<&str> {
        match self {
            Self::ActionExecution { stage_id, .. } => Some(stage_id),
            _ => None,
        }
    }

    /// Id of the failing action, if the run stopped on an action error.
    pub fn action_id(&self) -> Option<&str> {
        match self {
            Self::ActionExecution { action_id, .. } => Some(action_id),
            _ => None,
        }
    }
}
