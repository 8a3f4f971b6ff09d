use crate::allocator::IdentifierKind;
use crate::bits::reverse_bits;
use crate::config::{PooledSequenceConfig, SequenceName};
use crate::error::{Error, Result};
use crate::exclude::ExcludedRanges;
use crate::mutex::Mutex;
use crate::source::ValueSource;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A bounded buffer of pre-fetched candidate identifier values for one
/// logical sequence.
///
/// The pool starts empty, fills with one batched [`ValueSource`] round trip
/// of `pool_size` raw values, and drains FIFO. For integral identifiers
/// every raw value is bit-reversed and values falling in the excluded set
/// are dropped; dropped values are not replaced within the same round trip,
/// they just shrink that refill. For opaque identifiers the raw values are
/// buffered untouched.
///
/// The buffer sits behind a mutex and the refill happens while the lock is
/// held, so exactly one refill round trip is in flight per sequence and
/// concurrent callers serialize instead of issuing duplicate round trips.
/// A refill failure leaves the pool empty and propagates the error; nothing
/// partial is kept.
pub struct SequencePool<S> {
    name: SequenceName,
    kind: IdentifierKind,
    pool_size: usize,
    excluded: ExcludedRanges,
    source: S,
    values: Mutex<VecDeque<i64>>,
}

impl<S: ValueSource> SequencePool<S> {
    pub fn new(config: &PooledSequenceConfig, kind: IdentifierKind, source: S) -> Self {
        Self {
            name: config.name().clone(),
            kind,
            pool_size: config.pool_size(),
            excluded: config.excluded().clone(),
            source,
            values: Mutex::new(VecDeque::new()),
        }
    }

    /// The sequence this pool belongs to.
    pub fn name(&self) -> &SequenceName {
        &self.name
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// Pops the next candidate value, refilling from the value source first
    /// if the pool is empty.
    ///
    /// May block on the pool lock and on the refill round trip. A batch
    /// fully consumed by exclusions triggers another round trip right away
    /// rather than surfacing an empty result; with exclusion ranges narrow
    /// relative to `pool_size` this terminates quickly, and no artificial
    /// cap is imposed on the number of consecutive refills.
    ///
    /// # Errors
    /// Propagates value-source failures unchanged (including transient
    /// aborts, which the caller's retry controller handles) and fails with
    /// [`Error::EmptyBatch`] if the source violates its contract by
    /// returning no values.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_next(&self) -> Result<i64> {
        let mut values = {
            #[cfg(feature = "parking-lot")]
            {
                self.values.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.values.lock()?
            }
        };

        loop {
            if let Some(value) = values.pop_front() {
                return Ok(value);
            }
            self.refill(&mut values)?;
        }
    }

    fn refill(&self, values: &mut VecDeque<i64>) -> Result<()> {
        let raw = self.source.fetch_next(self.pool_size)?;
        if raw.is_empty() {
            return Err(Error::EmptyBatch);
        }
        #[cfg(feature = "tracing")]
        let fetched = raw.len();
        match self.kind {
            IdentifierKind::Integral => {
                values.extend(
                    raw.into_iter()
                        .map(reverse_bits)
                        .filter(|value| !self.excluded.contains(*value)),
                );
            }
            IdentifierKind::Opaque => values.extend(raw),
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            sequence = %self.name,
            fetched,
            usable = values.len(),
            "refilled identifier pool"
        );
        Ok(())
    }
}

/// An explicit registry of pools, one per [`SequenceName`].
///
/// Allocators for entities sharing a logical sequence must also share its
/// pool; holding the mapping in an owned registry (instead of a process
/// global) keeps construction explicit and lets tests wire independent fake
/// sources.
pub struct PoolRegistry<S> {
    pools: Mutex<BTreeMap<SequenceName, Arc<SequencePool<S>>>>,
}

impl<S> Default for PoolRegistry<S> {
    fn default() -> Self {
        Self {
            pools: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<S: ValueSource> PoolRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pool registered for `config`'s sequence, creating it with
    /// `make_source` on first use. The factory is not called when the pool
    /// already exists.
    pub fn get_or_create(
        &self,
        config: &PooledSequenceConfig,
        kind: IdentifierKind,
        make_source: impl FnOnce() -> S,
    ) -> Result<Arc<SequencePool<S>>> {
        let mut pools = {
            #[cfg(feature = "parking-lot")]
            {
                self.pools.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.pools.lock()?
            }
        };
        if let Some(pool) = pools.get(config.name()) {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(SequencePool::new(config, kind, make_source()));
        pools.insert(config.name().clone(), Arc::clone(&pool));
        Ok(pool)
    }

    /// Looks up an existing pool without creating one.
    pub fn get(&self, name: &SequenceName) -> Result<Option<Arc<SequencePool<S>>>> {
        let pools = {
            #[cfg(feature = "parking-lot")]
            {
                self.pools.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.pools.lock()?
            }
        };
        Ok(pools.get(name).map(Arc::clone))
    }
}
