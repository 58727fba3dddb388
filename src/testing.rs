//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::Proposal;
use crate::Zxid;
use crate::error::LogReadError;
use crate::log_view::TxnLogRead;

pub(crate) fn zxid(epoch: u32, counter: u32) -> Zxid {
    Zxid::new(epoch, counter)
}

pub(crate) fn raw(raw: u64) -> Zxid {
    Zxid::from_raw(raw)
}

pub(crate) fn proposal(zxid: Zxid) -> Proposal {
    Proposal::new(zxid, Vec::new())
}

pub(crate) fn proposal_sized(zxid: Zxid, payload_len: usize) -> Proposal {
    Proposal::new(zxid, vec![0u8; payload_len])
}

/// In-memory txn log fixture.
///
/// Mirrors a real store's positioning contract: a request below the oldest
/// retained entry yields an empty iterator, anything else replays from the
/// start of the retained sequence. Tracks iterator release so tests can
/// assert the handle is dropped on every path.
pub(crate) struct MemTxnLog {
    entries: Vec<Proposal>,
    released: Arc<AtomicBool>,
}

impl MemTxnLog {
    pub(crate) fn new(entries: Vec<Proposal>) -> Self {
        Self {
            entries,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn released_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }
}

impl TxnLogRead for MemTxnLog {
    type Iter = MemTxnIter;

    fn open_from(&self, from: Zxid, _size_budget: u64) -> Result<Self::Iter, LogReadError> {
        let entries = match self.entries.first() {
            Some(first) if from >= first.zxid => self.entries.clone(),
            _ => Vec::new(),
        };

        Ok(MemTxnIter {
            inner: entries.into_iter(),
            released: self.released.clone(),
        })
    }
}

pub(crate) struct MemTxnIter {
    inner: std::vec::IntoIter<Proposal>,
    released: Arc<AtomicBool>,
}

impl Iterator for MemTxnIter {
    type Item = Result<Proposal, LogReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Ok)
    }
}

impl Drop for MemTxnIter {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// A txn log whose iterator fails immediately, for error-path tests.
pub(crate) struct FailingTxnLog {
    released: Arc<AtomicBool>,
}

impl FailingTxnLog {
    pub(crate) fn new() -> Self {
        Self {
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn released_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }
}

impl TxnLogRead for FailingTxnLog {
    type Iter = FailingTxnIter;

    fn open_from(&self, from: Zxid, _size_budget: u64) -> Result<Self::Iter, LogReadError> {
        Ok(FailingTxnIter {
            error: Some(LogReadError::message(from, "log segment checksum mismatch")),
            released: self.released.clone(),
        })
    }
}

pub(crate) struct FailingTxnIter {
    error: Option<LogReadError>,
    released: Arc<AtomicBool>,
}

impl Iterator for FailingTxnIter {
    type Item = Result<Proposal, LogReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.error.take().map(Err)
    }
}

impl Drop for FailingTxnIter {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
