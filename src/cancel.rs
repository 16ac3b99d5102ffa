//! Cooperative cancellation for the blocking phases of a run.
//!
//! A run suspends in exactly two places: the script download and the remote
//! setup/launch. Both take a `CancellationToken` and surface a distinct
//! `Error::Interrupted` when the token trips, so callers can tell an aborted
//! run apart from an ordinary failure. The token stays set once tripped.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Cloning is cheap and all clones observe the
/// same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Error::Interrupted` if the token has tripped.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Interrupted(format!("{operation} was interrupted")))
        } else {
            Ok(())
        }
    }

    /// Maps an I/O error to the interruption outcome when it reports
    /// `ErrorKind::Interrupted`, tripping the token so later checks agree.
    pub fn classify_io(&self, operation: &str, error: std::io::Error) -> Error {
        if error.kind() == std::io::ErrorKind::Interrupted {
            self.cancel();
            Error::Interrupted(format!("{operation} was interrupted"))
        } else {
            Error::Io(error)
        }
    }
}
