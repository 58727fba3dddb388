use std::fmt;

use crate::Zxid;

/// A committed transaction as retained for follower synchronization.
///
/// Immutable once accepted: the window and the txn log only ever hand out
/// proposals whose zxid and payload were fixed at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Proposal {
    pub zxid: Zxid,
    /// Opaque serialized txn record; this crate never looks inside it.
    pub data: Vec<u8>,
}

impl Proposal {
    pub fn new(zxid: Zxid, data: Vec<u8>) -> Self {
        Self { zxid, data }
    }

    /// Payload size counted against the DIFF byte budget.
    pub fn payload_len(&self) -> u64 {
        self.data.len() as u64
    }
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proposal({}, {} bytes)", self.zxid, self.data.len())
    }
}
