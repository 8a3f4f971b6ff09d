use crate::error::Result;

/// A source of raw, strictly increasing 64-bit counter values backed by a
/// server-side sequence construct.
///
/// One call is one round trip: `fetch_next(count)` returns `count` fresh
/// values in the order the sequence produced them. Raw values are
/// monotonically increasing within one logical sequence but carry no
/// uniqueness guarantee across sequences.
///
/// Failure policy belongs to the caller, not the source. When the backing
/// transactional engine aborts the fetch because of a concurrent
/// modification, the returned error must carry an [`AbortedError`] somewhere
/// in its cause chain so the retry controller can recognize it; every other
/// error propagates to the application unchanged.
///
/// Implementations manage their own interior mutability (a connection
/// handle, an in-memory counter behind a `Cell` or atomic), which keeps the
/// trait object shareable behind the pool lock.
///
/// [`AbortedError`]: crate::AbortedError
pub trait ValueSource {
    /// Fetches the next `count` raw values in a single round trip.
    fn fetch_next(&self, count: usize) -> Result<Vec<i64>>;
}

impl<S: ValueSource + ?Sized> ValueSource for &S {
    fn fetch_next(&self, count: usize) -> Result<Vec<i64>> {
        (**self).fetch_next(count)
    }
}

impl<S: ValueSource + ?Sized> ValueSource for std::sync::Arc<S> {
    fn fetch_next(&self, count: usize) -> Result<Vec<i64>> {
        (**self).fetch_next(count)
    }
}
