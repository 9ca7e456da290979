use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ArchiveError;

/// Cooperative cancellation flag shared between a caller and running walks.
///
/// Clones observe the same flag. Walks check it before every entry and stop
/// with [`ArchiveError::Cancelled`] once it is raised, regardless of any
/// continue-on-error setting.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag for every clone of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns [`ArchiveError::Cancelled`] when the flag is raised.
    pub fn check(&self) -> Result<(), ArchiveError> {
        if self.is_cancelled() {
            Err(ArchiveError::Cancelled)
        } else {
            Ok(())
        }
    }
}
