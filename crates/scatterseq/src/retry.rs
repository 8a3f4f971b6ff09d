use crate::error::{Error, Result, aborted_cause};
use core::time::Duration;

/// Maximum number of times one allocation runs its value-source round trip
/// before a persistent transient conflict is handed back to the caller.
pub const MAX_ATTEMPTS: u32 = 100;

/// Fallback backoff used when the engine's abort does not suggest a delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// How the retry controller waits between attempts.
///
/// `sleep_for` returns `false` when the wait was cancelled, in which case
/// the whole allocation attempt is abandoned with [`Error::Interrupted`]
/// instead of being retried.
pub trait SleepProvider {
    fn sleep_for(&self, dur: Duration) -> bool;
}

impl<S: SleepProvider + ?Sized> SleepProvider for &S {
    fn sleep_for(&self, dur: Duration) -> bool {
        (**self).sleep_for(dur)
    }
}

/// Sleeps on the calling thread. The wait cannot be cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl SleepProvider for ThreadSleeper {
    fn sleep_for(&self, dur: Duration) -> bool {
        std::thread::sleep(dur);
        true
    }
}

/// Bounded retry-with-sleep around value-source round trips.
///
/// Exactly one failure class is retried: a fetch aborted by the engine due
/// to a concurrent modification, recognized by walking the error's cause
/// chain (see [`aborted_cause`]). Everything else propagates on first
/// occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Runs `op` until it succeeds, fails fatally, or exhausts the attempt
    /// budget.
    ///
    /// Each retry re-runs `op` from scratch; no partial state carries over
    /// between attempts. On exhaustion the last transient error is returned
    /// unchanged. A cancelled sleep aborts immediately with
    /// [`Error::Interrupted`].
    pub fn with_retry<T, S, F>(&self, sleep: &S, mut op: F) -> Result<T>
    where
        S: SleepProvider,
        F: FnMut() -> Result<T>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let delay = match aborted_cause(&err) {
                None => return Err(err),
                Some(aborted) => aborted.retry_delay().unwrap_or(self.retry_delay),
            };
            if attempts >= self.max_attempts {
                return Err(err);
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempts,
                delay_ms = delay.as_millis() as u64,
                "fetch aborted by a concurrent modification; retrying"
            );
            if !sleep.sleep_for(delay) {
                return Err(Error::Interrupted);
            }
        }
    }
}
