use std::error::Error;
use std::fmt;

use validit::Validate;

use crate::PacketKind;
use crate::QuorumPacket;
use crate::Zxid;

/// How a follower's log is brought in line with the leader's history.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SyncStrategy {
    /// The follower's state is too far off; it receives a full snapshot.
    Snap,
    /// The follower's log is a prefix of ours; ship the missing proposals.
    Diff,
    /// The follower holds proposals we never committed; roll it back first.
    TruncDiff,
}

/// The complete, ordered outcome of one sync decision.
///
/// Either `strategy` is [`SyncStrategy::Snap`] and `packets` is empty (the
/// caller streams a snapshot out of band), or `packets` starts with exactly
/// one DIFF or TRUNC followed by (PROPOSAL, COMMIT) pairs in strictly
/// increasing zxid order. `forward_from` is the handoff point for the
/// broadcast layer: every newly committed proposal with a greater zxid must
/// be forwarded to the learner in commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SyncPlan {
    pub strategy: SyncStrategy,
    /// The zxid the follower must roll its log back to, when truncating.
    pub trunc_to: Option<Zxid>,
    /// The DIFF anchor sent to the follower, when diffing.
    pub diff_to: Option<Zxid>,
    pub forward_from: Zxid,
    pub packets: Vec<QuorumPacket>,
}

impl SyncPlan {
    pub(crate) fn snap(last_processed: Zxid) -> Self {
        Self {
            strategy: SyncStrategy::Snap,
            trunc_to: None,
            diff_to: None,
            forward_from: last_processed,
            packets: Vec::new(),
        }
    }

    /// Whether the caller must stream a snapshot instead of the packet list.
    pub fn needs_snap(&self) -> bool {
        self.strategy == SyncStrategy::Snap
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncPlan({:?}", self.strategy)?;
        if let Some(trunc_to) = self.trunc_to {
            write!(f, ", trunc_to={}", trunc_to)?;
        }
        if let Some(diff_to) = self.diff_to {
            write!(f, ", diff_to={}", diff_to)?;
        }
        write!(f, ", forward_from={}, {} packets)", self.forward_from, self.packets.len())
    }
}

impl Validate for SyncPlan {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.needs_snap() {
            if !self.packets.is_empty() {
                return Err(format!("snapshot plan carries {} packets", self.packets.len()).into());
            }
            return Ok(());
        }

        let head = match self.packets.first() {
            Some(head) => head,
            None => return Err("non-snapshot plan has no packets".into()),
        };
        if !head.kind.is_opener() {
            return Err(format!("plan opens with {} instead of DIFF or TRUNC", head).into());
        }

        let mut last_shipped = None;
        let mut i = 1;
        while i < self.packets.len() {
            let proposal = &self.packets[i];
            if proposal.kind != PacketKind::Proposal {
                return Err(format!("expected PROPOSAL at index {}, found {}", i, proposal).into());
            }
            let commit = match self.packets.get(i + 1) {
                Some(commit) => commit,
                None => return Err(format!("{} has no trailing COMMIT", proposal).into()),
            };
            if commit.kind != PacketKind::Commit || commit.zxid != proposal.zxid {
                return Err(format!("{} followed by {} instead of its COMMIT", proposal, commit).into());
            }
            if let Some(last) = last_shipped {
                if proposal.zxid <= last {
                    return Err(format!("{} shipped out of order after {}", proposal, last).into());
                }
            }
            last_shipped = Some(proposal.zxid);
            i += 2;
        }

        let expected_forward = last_shipped.unwrap_or(head.zxid);
        if self.forward_from != expected_forward {
            return Err(format!(
                "forward_from {} does not match last shipped zxid {}",
                self.forward_from, expected_forward
            )
            .into());
        }

        Ok(())
    }
}
