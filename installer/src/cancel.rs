//! Cooperative cancellation.
//!
//! The pipeline checks a [`CancellationToken`] between stages and before
//! each file copy. Copies already in flight finish via temp-file-and-rename,
//! so observing cancellation never leaves a truncated destination.

use crate::error::{InstallerError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag signalling that the current install should stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone of the token observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Return true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with [`InstallerError::Cancelled`] when cancellation was
    /// requested before `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Cancelled`] naming `stage`.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulary_installer::cancel::CancellationToken;
    ///
    /// let token = CancellationToken::new();
    /// assert!(token.check("fetch").is_ok());
    /// token.clone().cancel();
    /// assert!(token.check("extract").is_err());
    /// ```
    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_cancelled() {
            log::debug!("cancelled before {stage}");
            return Err(InstallerError::Cancelled { stage });
        }
        Ok(())
    }

    /// Raw flag, for binding to a signal handler.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}
