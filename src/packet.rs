use std::fmt;

use crate::Proposal;
use crate::Zxid;

/// Packet type tags on the learner wire.
///
/// The numeric values are interface constants fixed by the surrounding ZAB
/// implementation; they are not a design choice of this crate. Only `Diff`,
/// `Trunc`, `Proposal` and `Commit` ever appear in plans built here —
/// `NewLeader`, `UpToDate` and `Snap` belong to the enclosing handshake and
/// snapshot layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(i32)]
pub enum PacketKind {
    Proposal = 2,
    Commit = 4,
    NewLeader = 10,
    UpToDate = 12,
    Diff = 13,
    Trunc = 14,
    Snap = 15,
}

impl PacketKind {
    pub const fn wire_tag(self) -> i32 {
        self as i32
    }

    /// Whether this kind may open a sync plan's packet sequence.
    pub const fn is_opener(self) -> bool {
        matches!(self, PacketKind::Diff | PacketKind::Trunc)
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketKind::Proposal => "PROPOSAL",
            PacketKind::Commit => "COMMIT",
            PacketKind::NewLeader => "NEWLEADER",
            PacketKind::UpToDate => "UPTODATE",
            PacketKind::Diff => "DIFF",
            PacketKind::Trunc => "TRUNC",
            PacketKind::Snap => "SNAP",
        };
        write!(f, "{}", name)
    }
}

/// A single packet queued for a learner.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct QuorumPacket {
    pub kind: PacketKind,
    pub zxid: Zxid,
    pub data: Vec<u8>,
}

impl QuorumPacket {
    /// A control packet carrying only a zxid (DIFF, TRUNC, COMMIT, ...).
    pub fn op(kind: PacketKind, zxid: Zxid) -> Self {
        Self {
            kind,
            zxid,
            data: Vec::new(),
        }
    }

    pub fn proposal(p: &Proposal) -> Self {
        Self {
            kind: PacketKind::Proposal,
            zxid: p.zxid,
            data: p.data.clone(),
        }
    }
}

impl fmt::Display for QuorumPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.zxid)
    }
}
