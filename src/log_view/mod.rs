//! Read-only facade over the leader's replicated log state.
//!
//! Three things decide how a follower is synchronized: the in-memory
//! committed proposal window, the on-disk transaction log, and the data
//! tree's last-processed zxid. This module binds them behind one
//! shared/exclusive lock so a whole sync plan can be built against a single
//! consistent view.

mod committed_window;
mod txn_log;

use std::sync::RwLock;
use std::sync::RwLockReadGuard;

use anyerror::AnyError;

pub use self::committed_window::CommittedWindow;
pub use self::txn_log::TxnLogRead;
use crate::Config;
use crate::Proposal;
use crate::Zxid;
use crate::error::LogReadError;
use crate::error::SyncError;

/// Log state guarded by the log lock: the committed window plus the data
/// tree's last-processed zxid.
struct LogState {
    window: CommittedWindow,
    last_processed_zxid: Zxid,
}

/// The leader's view of its replicated log, shared between the sync decider
/// (reader) and the broadcast pipeline (writer).
///
/// [`read`](LeaderLogView::read) hands out a [`LogReadGuard`] holding the
/// lock shared; the decider builds the entire plan under one guard so the
/// window and `last_processed_zxid` cannot shift underneath it. Appends take
/// the lock exclusively and block while any plan is under construction.
pub struct LeaderLogView<T> {
    state: RwLock<LogState>,
    txn_log: T,
    txn_log_size_budget: u64,
}

impl<T> LeaderLogView<T>
where T: TxnLogRead
{
    pub fn new(config: &Config, txn_log: T) -> Self {
        Self {
            state: RwLock::new(LogState {
                window: CommittedWindow::new(config.committed_window_capacity),
                last_processed_zxid: Zxid::ZERO,
            }),
            txn_log,
            txn_log_size_budget: config.txn_log_size_budget,
        }
    }

    /// Acquire the log lock shared for the duration of a sync decision.
    pub fn read(&self) -> Result<LogReadGuard<'_, T>, SyncError> {
        let state = self.state.read().map_err(|e| SyncError::Fatal(AnyError::error(e)))?;
        Ok(LogReadGuard {
            state,
            txn_log: &self.txn_log,
            txn_log_size_budget: self.txn_log_size_budget,
        })
    }

    /// Retain a freshly committed proposal for DIFF sync.
    ///
    /// Called by the broadcast pipeline; takes the log lock exclusively and
    /// therefore serializes against in-flight sync decisions.
    pub fn append_committed(&self, proposal: Proposal) -> Result<(), SyncError> {
        let mut state = self.state.write().map_err(|e| SyncError::Fatal(AnyError::error(e)))?;
        state.window.push(proposal);
        Ok(())
    }

    /// Record that the data tree applied a transaction.
    ///
    /// The window may lag behind the data tree; `last_processed_zxid` only
    /// moves forward.
    pub fn note_applied(&self, zxid: Zxid) -> Result<(), SyncError> {
        let mut state = self.state.write().map_err(|e| SyncError::Fatal(AnyError::error(e)))?;
        if zxid > state.last_processed_zxid {
            state.last_processed_zxid = zxid;
        }
        Ok(())
    }

    /// Install the epoch-opening marker after an election.
    ///
    /// The marker zxid `(epoch, 0)` has no transaction record of its own;
    /// only the data tree state id moves.
    pub fn install_epoch(&self, epoch: u32) -> Result<(), SyncError> {
        let marker = Zxid::new(epoch, 0);
        tracing::info!("installing epoch marker {}", marker);
        let mut state = self.state.write().map_err(|e| SyncError::Fatal(AnyError::error(e)))?;
        state.last_processed_zxid = marker;
        Ok(())
    }
}

/// Shared view of the log state, valid for the lifetime of one lock
/// acquisition.
pub struct LogReadGuard<'a, T> {
    state: RwLockReadGuard<'a, LogState>,
    txn_log: &'a T,
    txn_log_size_budget: u64,
}

impl<'a, T> LogReadGuard<'a, T>
where T: TxnLogRead
{
    pub fn last_processed_zxid(&self) -> Zxid {
        self.state.last_processed_zxid
    }

    pub fn committed_min(&self) -> Zxid {
        self.state.window.min_zxid()
    }

    pub fn committed_max(&self) -> Zxid {
        self.state.window.max_zxid()
    }

    pub fn committed_is_empty(&self) -> bool {
        self.state.window.is_empty()
    }

    /// Iterate the committed window in commit order.
    pub fn iter_committed(&self) -> impl Iterator<Item = &Proposal> {
        self.state.window.iter()
    }

    /// Iterate window proposals with zxid strictly greater than `after`.
    pub fn iter_committed_from(&self, after: Zxid) -> impl Iterator<Item = &Proposal> {
        self.state.window.iter_from(after)
    }

    /// The largest total payload the leader ships via DIFF from the txn log.
    pub fn txn_log_size_budget(&self) -> u64 {
        self.txn_log_size_budget
    }

    /// Whether txn-log based sync is enabled at all.
    pub fn txn_log_sync_enabled(&self) -> bool {
        self.txn_log_size_budget != 0
    }

    /// Open a scoped txn-log iterator under the configured size budget.
    pub fn open_txn_log(&self, from: Zxid) -> Result<T::Iter, LogReadError> {
        self.txn_log.open_from(from, self.txn_log_size_budget)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::Config;
    use crate::LeaderLogView;
    use crate::Zxid;
    use crate::testing::MemTxnLog;
    use crate::testing::proposal;
    use crate::testing::raw;

    fn view() -> LeaderLogView<MemTxnLog> {
        LeaderLogView::new(&Config::default(), MemTxnLog::empty())
    }

    #[test]
    fn test_note_applied_only_moves_forward() -> anyhow::Result<()> {
        let view = view();
        view.note_applied(raw(5))?;
        view.note_applied(raw(3))?;
        assert_eq!(raw(5), view.read()?.last_processed_zxid());
        Ok(())
    }

    #[test]
    fn test_install_epoch_sets_marker() -> anyhow::Result<()> {
        let view = view();
        view.note_applied(raw(7))?;
        view.install_epoch(2)?;

        let guard = view.read()?;
        assert_eq!(Zxid::new(2, 0), guard.last_processed_zxid());
        assert!(guard.last_processed_zxid().is_epoch_open());
        Ok(())
    }

    #[test]
    fn test_guard_exposes_window_bounds() -> anyhow::Result<()> {
        let view = view();
        assert_eq!(Zxid::ZERO, view.read()?.committed_min());

        view.append_committed(proposal(raw(2)))?;
        view.append_committed(proposal(raw(3)))?;

        let guard = view.read()?;
        assert_eq!(raw(2), guard.committed_min());
        assert_eq!(raw(3), guard.committed_max());
        assert!(!guard.committed_is_empty());
        Ok(())
    }
}
