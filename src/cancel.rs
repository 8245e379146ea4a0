//! Cooperative Cancellation
//!
//! A [`CancelToken`] is threaded through a run and checked by the engine
//! before every stage and every action. Actions can check it themselves for
//! long-running work; the engine never interrupts an action in progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::CancelReason;

/// Cloneable cancellation handle with an optional deadline.
///
/// Clones share the same cancellation flag, so cancelling any clone cancels
/// them all.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a token that is only done once [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is done at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Creates a token that is done `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Marks the token, and every clone of it, as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// The deadline this token was created with, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once the token was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Returns the reason the token is done, if it is.
    pub fn check(&self) -> Result<(), CancelReason> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CancelReason::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
