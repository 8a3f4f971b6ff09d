use crate::bits::reverse_bits;
use crate::config::{PooledSequenceConfig, SequenceConfig};
use crate::error::{Error, Result};
use crate::pool::{PoolRegistry, SequencePool};
use crate::retry::{RetryPolicy, SleepProvider, ThreadSleeper};
use crate::source::ValueSource;
use std::sync::Arc;

/// Whether the entity's identifier column holds an integer.
///
/// Resolved once from the entity's static type information when the
/// allocator is constructed, never re-checked per call. Only integral
/// identifiers are bit-reversed and exclusion-filtered; an opaque
/// identifier (string, UUID-like) receives the raw counter value untouched
/// and the application decides how to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Integral,
    Opaque,
}

/// The pooled allocator: one finished identifier per call, batched round
/// trips underneath.
///
/// Composes a shared [`SequencePool`] with a [`RetryPolicy`]. `generate`
/// drains the pool; when the pool refills, a transient transaction abort
/// from the value source is retried with backoff, bounded by
/// [`MAX_ATTEMPTS`].
///
/// # Example
/// ```
/// use scatterseq::{
///     IdentifierKind, POOL_SIZE_PARAM, Params, PooledAllocator, PooledSequenceConfig, Result,
///     SEQUENCE_PARAM, ValueSource, reverse_bits,
/// };
/// use std::sync::atomic::{AtomicI64, Ordering};
///
/// struct CounterSource(AtomicI64);
/// impl ValueSource for CounterSource {
///     fn fetch_next(&self, count: usize) -> Result<Vec<i64>> {
///         Ok((0..count as i64)
///             .map(|_| self.0.fetch_add(1, Ordering::Relaxed))
///             .collect())
///     }
/// }
///
/// let params = Params::new()
///     .with(SEQUENCE_PARAM, "singer_id")
///     .with(POOL_SIZE_PARAM, "5");
/// let config = PooledSequenceConfig::from_params(&params).unwrap();
/// let allocator =
///     PooledAllocator::new(&config, IdentifierKind::Integral, CounterSource(AtomicI64::new(1)));
/// assert_eq!(allocator.generate().unwrap(), reverse_bits(1));
/// assert_eq!(allocator.generate().unwrap(), reverse_bits(2));
/// ```
///
/// [`MAX_ATTEMPTS`]: crate::MAX_ATTEMPTS
pub struct PooledAllocator<S, P = ThreadSleeper> {
    pool: Arc<SequencePool<S>>,
    retry: RetryPolicy,
    sleep: P,
}

impl<S: ValueSource> PooledAllocator<S> {
    /// Builds an allocator with its own private pool, the default retry
    /// policy, and thread sleeps.
    pub fn new(config: &PooledSequenceConfig, kind: IdentifierKind, source: S) -> Self {
        Self::with_pool(
            Arc::new(SequencePool::new(config, kind, source)),
            RetryPolicy::default(),
            ThreadSleeper,
        )
    }

    /// Builds an allocator over the registry's pool for this sequence,
    /// creating the pool (and its value source) on first use. Allocators
    /// built from the same registry and sequence share one pool.
    pub fn from_registry(
        registry: &PoolRegistry<S>,
        config: &PooledSequenceConfig,
        kind: IdentifierKind,
        make_source: impl FnOnce() -> S,
    ) -> Result<Self> {
        Ok(Self::with_pool(
            registry.get_or_create(config, kind, make_source)?,
            RetryPolicy::default(),
            ThreadSleeper,
        ))
    }
}

impl<S: ValueSource, P: SleepProvider> PooledAllocator<S, P> {
    /// Full-control constructor: an explicit pool handle, retry policy, and
    /// sleep provider.
    pub fn with_pool(pool: Arc<SequencePool<S>>, retry: RetryPolicy, sleep: P) -> Self {
        Self { pool, retry, sleep }
    }

    /// Returns the next identifier value for an inserted row.
    ///
    /// For an integral identifier this is a bit-reversed sequence value
    /// outside every excluded range; for an opaque identifier it is the raw
    /// counter value. Blocks while the pool refills and while transient
    /// aborts back off.
    pub fn generate(&self) -> Result<i64> {
        self.retry.with_retry(&self.sleep, || self.pool.try_next())
    }

    /// The pool backing this allocator.
    pub fn pool(&self) -> &Arc<SequencePool<S>> {
        &self.pool
    }
}

/// The non-pooled allocator: one value-source round trip per identifier.
///
/// Fetches a single raw value, bit-reverses it, and re-checks the result
/// against the (possibly multi-range) excluded set; an excluded value is
/// skipped by fetching again within the same attempt. Transient aborts are
/// retried exactly like the pooled variant.
pub struct SequenceAllocator<S, P = ThreadSleeper> {
    config: SequenceConfig,
    kind: IdentifierKind,
    source: S,
    retry: RetryPolicy,
    sleep: P,
}

impl<S: ValueSource> SequenceAllocator<S> {
    pub fn new(config: SequenceConfig, kind: IdentifierKind, source: S) -> Self {
        Self::with_parts(config, kind, source, RetryPolicy::default(), ThreadSleeper)
    }
}

impl<S: ValueSource, P: SleepProvider> SequenceAllocator<S, P> {
    /// Full-control constructor with an explicit retry policy and sleep
    /// provider.
    pub fn with_parts(
        config: SequenceConfig,
        kind: IdentifierKind,
        source: S,
        retry: RetryPolicy,
        sleep: P,
    ) -> Self {
        Self {
            config,
            kind,
            source,
            retry,
            sleep,
        }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Returns the next identifier value for an inserted row.
    pub fn generate(&self) -> Result<i64> {
        match self.kind {
            IdentifierKind::Opaque => self.retry.with_retry(&self.sleep, || self.fetch_one()),
            IdentifierKind::Integral => self.retry.with_retry(&self.sleep, || {
                loop {
                    let value = reverse_bits(self.fetch_one()?);
                    if !self.config.excluded().contains(value) {
                        return Ok(value);
                    }
                    // Excluded value: skip it with another fetch inside the
                    // same attempt; only aborts consume the retry budget.
                }
            }),
        }
    }

    fn fetch_one(&self) -> Result<i64> {
        self.source
            .fetch_next(1)?
            .into_iter()
            .next()
            .ok_or(Error::EmptyBatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Params, SEQUENCE_PARAM};

    struct EmptySource;

    impl ValueSource for EmptySource {
        fn fetch_next(&self, _count: usize) -> Result<Vec<i64>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn empty_batch_from_the_source_is_an_error() {
        let params = Params::new().with(SEQUENCE_PARAM, "singer_id");
        let config = SequenceConfig::from_params(&params).unwrap();
        let allocator = SequenceAllocator::new(config, IdentifierKind::Integral, EmptySource);
        assert!(matches!(allocator.generate(), Err(Error::EmptyBatch)));

        let pooled_config = crate::config::PooledSequenceConfig::from_params(&params).unwrap();
        let pooled = PooledAllocator::new(&pooled_config, IdentifierKind::Integral, EmptySource);
        assert!(matches!(pooled.generate(), Err(Error::EmptyBatch)));
    }
}
