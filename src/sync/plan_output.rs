use crate::PacketKind;
use crate::Proposal;
use crate::QuorumPacket;
use crate::Zxid;
use crate::sync::SyncPlan;
use crate::sync::SyncStrategy;

/// Accumulates the packet sequence of one sync plan under construction.
///
/// The first packet of any non-snapshot plan must be DIFF or TRUNC; until
/// that opener is queued the output reports `needs_op_packet`. Queueing a
/// proposal while the opener is still owed is a programming error.
#[derive(Debug, Default)]
pub(crate) struct PlanOutput {
    packets: Vec<QuorumPacket>,
    opener: Option<(PacketKind, Zxid)>,
    shipped_bytes: u64,
}

impl PlanOutput {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether the DIFF/TRUNC opener is still owed.
    pub(crate) fn needs_op_packet(&self) -> bool {
        self.opener.is_none()
    }

    pub(crate) fn queue_opener(&mut self, kind: PacketKind, zxid: Zxid) {
        debug_assert!(kind.is_opener(), "{} cannot open a plan", kind);
        debug_assert!(self.opener.is_none(), "plan already opened with {:?}", self.opener);

        tracing::debug!("queue opener: {}({})", kind, zxid);
        self.opener = Some((kind, zxid));
        self.packets.push(QuorumPacket::op(kind, zxid));
    }

    /// Queue a committed proposal followed by its COMMIT.
    pub(crate) fn queue_committed(&mut self, proposal: &Proposal) {
        debug_assert!(self.opener.is_some(), "PROPOSAL queued before DIFF/TRUNC opener");

        self.shipped_bytes += proposal.payload_len();
        self.packets.push(QuorumPacket::proposal(proposal));
        self.packets.push(QuorumPacket::op(PacketKind::Commit, proposal.zxid));
    }

    /// Total proposal payload queued so far, counted against the DIFF budget.
    pub(crate) fn shipped_bytes(&self) -> u64 {
        self.shipped_bytes
    }

    /// Drop everything queued so far and owe the opener again.
    ///
    /// Used when a diff attempt is abandoned in favour of a snapshot.
    pub(crate) fn discard(&mut self) {
        tracing::debug!("discarding {} queued packets", self.packets.len());
        self.packets.clear();
        self.opener = None;
        self.shipped_bytes = 0;
    }

    /// Finish a non-snapshot plan.
    ///
    /// Returns `None` when no opener was ever queued; the caller falls back
    /// to a snapshot.
    pub(crate) fn into_plan(self, forward_from: Zxid) -> Option<SyncPlan> {
        let (kind, anchor) = self.opener?;
        let (strategy, trunc_to, diff_to) = match kind {
            PacketKind::Diff => (SyncStrategy::Diff, None, Some(anchor)),
            _ => (SyncStrategy::TruncDiff, Some(anchor), None),
        };

        Some(SyncPlan {
            strategy,
            trunc_to,
            diff_to,
            forward_from,
            packets: self.packets,
        })
    }
}
