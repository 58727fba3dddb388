use crate::Proposal;
use crate::Zxid;
use crate::error::LogReadError;

/// Read access to the persisted, append-only transaction log.
///
/// The log retains history beyond the in-memory committed window and is the
/// source of truth for synchronizing a follower that fell behind the window.
///
/// The iterator owns the underlying resource (an open file handle in a real
/// store) and must release it when dropped, on every exit path. Callers keep
/// the iterator scoped to a single sync decision; it never crosses the log
/// lock boundary.
pub trait TxnLogRead {
    type Iter: Iterator<Item = Result<Proposal, LogReadError>>;

    /// Open a forward iterator positioned at the closest retained entry at or
    /// below `from`.
    ///
    /// The iteration may therefore begin with entries whose zxid is `<= from`;
    /// the consumer skips those while tracking the greatest zxid below `from`
    /// as a truncation anchor. Implementations return an empty iterator when
    /// `from` predates the oldest retained entry, and may return an empty
    /// iterator when the estimated replay size exceeds `size_budget` bytes.
    fn open_from(&self, from: Zxid, size_budget: u64) -> Result<Self::Iter, LogReadError>;
}
