//! Hotspot-safe identifier allocation for range-partitioned databases.
//!
//! Monotonically increasing primary keys concentrate writes on a single
//! partition of a range-sharded table. `scatterseq` draws raw counter values
//! from a server-side sequence, reverses their bit order to spread them
//! uniformly across the key space, skips configured excluded ranges, batches
//! round trips through a per-sequence pool, and retries transparently when
//! the backing transactional engine aborts a fetch due to a concurrent
//! modification.
//!
//! The two entry points are [`PooledAllocator`] (batched fetches through a
//! shared [`SequencePool`]) and [`SequenceAllocator`] (one round trip per
//! value, with multi-range exclusion support).

mod allocator;
mod bits;
mod config;
mod error;
mod exclude;
mod mutex;
mod pool;
mod retry;
mod source;

pub use crate::allocator::*;
pub use crate::bits::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::exclude::*;
pub use crate::pool::*;
pub use crate::retry::*;
pub use crate::source::*;
