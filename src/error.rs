//! Error types exposed by this crate.

use anyerror::AnyError;

use crate::Zxid;

/// Failure to read the persisted transaction log.
///
/// Raised by [`TxnLogRead`](crate::log_view::TxnLogRead) implementations
/// when opening or advancing a log iterator fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("txn log unreadable at {zxid}: {source}")]
pub struct LogReadError {
    /// The zxid the reader was positioned at or seeking to.
    pub zxid: Zxid,
    pub source: AnyError,
}

impl LogReadError {
    pub fn new(zxid: Zxid, source: &(impl std::error::Error + 'static)) -> Self {
        Self {
            zxid,
            source: AnyError::new(source),
        }
    }

    pub fn message(zxid: Zxid, msg: impl ToString) -> Self {
        Self {
            zxid,
            source: AnyError::error(msg),
        }
    }
}

/// Errors surfaced by follower synchronization.
///
/// Recoverable downgrades (txn-log gap, cross-epoch truncation, byte budget
/// exhaustion) are not errors: the decider silently answers SNAP for those.
/// What remains is either an unreadable log, where the caller must drop the
/// learner connection, or a fatal condition under which leadership is
/// untenable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    LogUnreadable(#[from] LogReadError),

    /// The leader log lock is poisoned; no further sync decision is sound.
    #[error("leader log state unusable: {0}")]
    Fatal(AnyError),
}

/// A container delete submission was refused by the request pipeline.
///
/// Non-fatal: the reaper logs it and reconsiders the candidate on the next
/// sweep.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("delete submission refused for {path}: {source}")]
pub struct SubmitError {
    pub path: String,
    pub source: AnyError,
}

impl SubmitError {
    pub fn new(path: impl ToString, source: &(impl std::error::Error + 'static)) -> Self {
        Self {
            path: path.to_string(),
            source: AnyError::new(source),
        }
    }

    pub fn message(path: impl ToString, msg: impl ToString) -> Self {
        Self {
            path: path.to_string(),
            source: AnyError::error(msg),
        }
    }
}

/// The learner handler hung up its packet channel.
///
/// The caller should abandon the sync attempt; the learner will reconnect
/// and be re-synchronized from scratch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, thiserror::Error)]
#[error("learner channel closed")]
pub struct LearnerGone;
