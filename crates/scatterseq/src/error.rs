use core::time::Duration;

/// A boxed error whose cause chain can be walked and downcast.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `scatterseq` can emit.
///
/// Configuration errors are fatal at construction time and are never
/// retried. Value-source failures keep their original cause as a `source()`
/// link so that [`aborted_cause`] can recognize a transient transaction
/// abort anywhere in the chain.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed generator configuration (sequence name, pool size, excluded
    /// ranges). Surfaced immediately when the allocator is built, not on
    /// first use.
    #[error("{0}")]
    Configuration(String),

    /// The underlying value source failed.
    ///
    /// This covers both transient transaction aborts and fatal failures
    /// (connectivity, permissions). Use [`aborted_cause`] to tell them
    /// apart; anything non-transient propagates to the caller unchanged.
    #[error("could not get next sequence values")]
    Source(#[source] BoxError),

    /// The value source returned an empty batch for a non-empty request.
    #[error("value source returned an empty batch")]
    EmptyBatch,

    /// A retry wait was cancelled before it completed. The allocation
    /// attempt is abandoned; it is not retried.
    #[error("interrupted while generating a new identifier")]
    Interrupted,

    /// The operation failed because the pool lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do not poison, so this
    /// variant is not available.
    #[cfg(not(feature = "parking-lot"))]
    #[error("lock poisoned")]
    LockPoisoned,
}

/// Marker error for a fetch that was aborted by the transactional engine
/// because of a concurrent modification.
///
/// Value sources are expected to place this somewhere in the cause chain of
/// the error they return when the engine reports such an abort. The retry
/// controller then re-runs the round trip instead of failing the
/// allocation. The engine may suggest how long to back off before the next
/// attempt; when it does not, the [`RetryPolicy`] fallback delay is used.
///
/// [`RetryPolicy`]: crate::RetryPolicy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
#[error("transaction was aborted due to a concurrent modification")]
pub struct AbortedError {
    retry_delay: Option<Duration>,
}

impl AbortedError {
    /// An abort without an engine-provided retry delay.
    pub const fn new() -> Self {
        Self { retry_delay: None }
    }

    /// An abort carrying the engine's suggested retry delay.
    pub const fn with_retry_delay(delay: Duration) -> Self {
        Self {
            retry_delay: Some(delay),
        }
    }

    /// The engine-provided retry delay, if any.
    pub const fn retry_delay(&self) -> Option<Duration> {
        self.retry_delay
    }
}

impl From<AbortedError> for Error {
    fn from(err: AbortedError) -> Self {
        Self::Source(Box::new(err))
    }
}

/// Walks the cause chain of `err` looking for an [`AbortedError`].
///
/// The transient-conflict signal is usually nested inside driver and
/// framework wrappers, so matching only the outermost error type is not
/// enough. Returns the marker if any link in the chain is one.
pub fn aborted_cause(err: &Error) -> Option<&AbortedError> {
    let mut cause: Option<&(dyn core::error::Error + 'static)> = Some(err);
    while let Some(err) = cause {
        if let Some(aborted) = err.downcast_ref::<AbortedError>() {
            return Some(aborted);
        }
        cause = err.source();
    }
    None
}

#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
