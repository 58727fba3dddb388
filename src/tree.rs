//! Narrow interfaces onto the replicated data tree and the request
//! pipeline, as consumed by the container reaper.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::SubmitError;

/// Ephemeral-owner field of a znode.
///
/// The encoding is fixed by the surrounding implementation: the container
/// tag is the minimum signed 64-bit value, and TTL nodes carry an `0xff`
/// high byte with the TTL milliseconds in the low 40 bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EphemeralOwner(pub u64);

const EXTENDED_TAG: u64 = 0xFF00_0000_0000_0000;
const TTL_VALUE_MASK: u64 = 0x0000_00FF_FFFF_FFFF;

impl EphemeralOwner {
    pub const VOID: EphemeralOwner = EphemeralOwner(0);
    pub const CONTAINER: EphemeralOwner = EphemeralOwner(0x8000_0000_0000_0000);

    pub fn ttl(ms: u64) -> Self {
        debug_assert!(ms <= TTL_VALUE_MASK, "ttl {} exceeds the encodable range", ms);
        EphemeralOwner(EXTENDED_TAG | (ms & TTL_VALUE_MASK))
    }

    pub fn session(id: u64) -> Self {
        EphemeralOwner(id)
    }

    pub fn kind(self) -> EphemeralKind {
        if self == Self::VOID {
            EphemeralKind::Void
        } else if self == Self::CONTAINER {
            EphemeralKind::Container
        } else if self.0 & EXTENDED_TAG == EXTENDED_TAG {
            EphemeralKind::Ttl(self.0 & TTL_VALUE_MASK)
        } else {
            EphemeralKind::Session(self.0)
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EphemeralKind {
    /// A plain persistent node.
    Void,
    /// A container: auto-deleted once it has had children and has none left.
    Container,
    /// A TTL node: auto-deleted once childless for longer than the value, in
    /// milliseconds.
    Ttl(u64),
    /// An ordinary ephemeral bound to a client session.
    Session(u64),
}

/// The attributes of a znode the reaper decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeView {
    /// Child-list version: 0 means no child was ever created under the node.
    pub cversion: i32,
    /// Last modification, wall-clock milliseconds.
    pub mtime_ms: u64,
    pub ephemeral_owner: EphemeralOwner,
    pub child_count: usize,
}

impl NodeView {
    pub fn has_children(&self) -> bool {
        self.child_count > 0
    }
}

/// Read access to the replicated data tree, narrowed to what the reaper
/// needs.
pub trait DataTreeView {
    /// Paths of all container znodes currently in the tree.
    fn container_paths(&self) -> BTreeSet<String>;

    /// Paths of all TTL znodes currently in the tree.
    fn ttl_paths(&self) -> BTreeSet<String>;

    /// Look up a node; `None` when it was deleted since the path listing.
    fn node(&self, path: &str) -> Option<NodeView>;
}

/// A deletion proposal for an empty container or expired TTL node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteContainerRequest {
    pub path: String,
}

impl DeleteContainerRequest {
    pub fn new(path: impl ToString) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

impl fmt::Display for DeleteContainerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeleteContainerRequest({})", self.path)
    }
}

/// The request pipeline that turns proposals into quorum traffic.
///
/// Submissions may fail, and on a non-leader they fail at the proposal
/// stage; both are harmless to the reaper.
pub trait RequestPipeline {
    fn submit(&self, request: DeleteContainerRequest) -> Result<(), SubmitError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::tree::EphemeralKind;
    use crate::tree::EphemeralOwner;

    #[test]
    fn test_ephemeral_owner_decoding() {
        assert_eq!(EphemeralKind::Void, EphemeralOwner::VOID.kind());
        assert_eq!(EphemeralKind::Container, EphemeralOwner::CONTAINER.kind());
        assert_eq!(EphemeralKind::Ttl(4_000), EphemeralOwner::ttl(4_000).kind());
        assert_eq!(EphemeralKind::Session(0x1234), EphemeralOwner::session(0x1234).kind());
    }
}
