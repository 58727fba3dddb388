//! The sync decider: given a connecting follower's last zxid, pick the
//! cheapest correct recovery strategy and build the exact packet sequence
//! that brings the follower in line with the leader's committed history.
//!
//! A wrong choice here silently corrupts the follower's replicated state
//! machine, so the whole decision is made under a single shared acquisition
//! of the log lock, against one consistent view of the committed window, the
//! txn log and the data tree state id.

mod plan;
mod plan_output;


use self::plan_output::PlanOutput;
pub use self::plan::SyncPlan;
pub use self::plan::SyncStrategy;
use crate::Config;
use crate::PacketKind;
use crate::Proposal;
use crate::Zxid;
use crate::error::LogReadError;
use crate::error::SyncError;
use crate::log_view::LogReadGuard;
use crate::log_view::TxnLogRead;

/// Decides how a connecting follower is synchronized.
///
/// [`decide`](SyncDecider::decide) never returns a partial plan: either a
/// complete ordered packet list with a valid forward-from handoff, or a
/// snapshot request.
pub struct SyncDecider {
    force_snap_sync: bool,
}

impl SyncDecider {
    pub fn new(config: &Config) -> Self {
        Self {
            force_snap_sync: config.force_snap_sync,
        }
    }

    /// Build the sync plan for a follower whose log ends at `peer_zxid`.
    ///
    /// The caller holds the log lock shared through `log` for the duration
    /// of this call; the plan is complete when it returns and the guard may
    /// then be dropped. On a snapshot plan the caller streams a snapshot
    /// whose embedded zxid equals the view's `last_processed_zxid`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn decide<T>(&self, log: &LogReadGuard<'_, T>, peer_zxid: Zxid) -> Result<SyncPlan, SyncError>
    where T: TxnLogRead {
        let last_processed = log.last_processed_zxid();
        let mut min_committed = log.committed_min();
        let mut max_committed = log.committed_max();

        // An empty window reduces every case below to comparisons against
        // the data tree state id.
        if log.committed_is_empty() {
            min_committed = last_processed;
            max_committed = last_processed;
        }

        tracing::info!(
            "synchronizing learner: peer={} last_processed={} window=[{}, {}]",
            peer_zxid,
            last_processed,
            min_committed,
            max_committed
        );

        let mut out = PlanOutput::new();
        let mut current = peer_zxid;
        let mut needs_snap = true;

        if self.force_snap_sync {
            tracing::warn!("forcing snapshot sync; this override is for testing only");
        } else if peer_zxid == last_processed {
            // Peer is already in sync; an empty DIFF re-anchors it.
            out.queue_opener(PacketKind::Diff, peer_zxid);
            needs_snap = false;
        } else if peer_zxid > max_committed && !peer_zxid.is_epoch_open() {
            // Peer holds proposals we have never seen; it may have been a
            // leader. Roll it back to our tip. An epoch-opening peer has no
            // txn of its own to roll back and falls through.
            out.queue_opener(PacketKind::Trunc, max_committed);
            current = max_committed;
            needs_snap = false;
        } else if min_committed <= peer_zxid && peer_zxid <= max_committed {
            tracing::debug!("using committed window for peer {}", peer_zxid);
            let window = log.iter_committed().map(|p| Ok(p.clone()));
            current = queue_committed_proposals(&mut out, window, peer_zxid, None, max_committed)?;
            needs_snap = false;
        } else if peer_zxid < min_committed && log.txn_log_sync_enabled() {
            let budget = log.txn_log_size_budget();
            let mut txn_iter = log.open_txn_log(peer_zxid)?.peekable();

            if txn_iter.peek().is_some() {
                tracing::debug!("using txn log and committed window for peer {}", peer_zxid);
                current =
                    queue_committed_proposals(&mut out, &mut txn_iter, peer_zxid, Some(min_committed), max_committed)?;

                if current.raw().saturating_add(1) < min_committed.raw() {
                    tracing::info!(
                        "gap between end of txn log {} and start of committed window {}; snapshot instead",
                        current,
                        min_committed
                    );
                    out.discard();
                } else if out.shipped_bytes() > budget {
                    tracing::info!(
                        "txn log replay of {} bytes exceeds the {} byte budget; snapshot instead",
                        out.shipped_bytes(),
                        budget
                    );
                    out.discard();
                } else {
                    // The txn log reached the window; switch to the window
                    // for the remainder to avoid re-reading from disk.
                    let window = log.iter_committed_from(current).map(|p| Ok(p.clone()));
                    current = queue_committed_proposals(&mut out, window, current, None, max_committed)?;
                    needs_snap = false;
                }
            }
            // txn_iter is dropped here, releasing the underlying handle on
            // every path out of this branch.
        } else {
            tracing::warn!("unhandled sync scenario for peer {}", peer_zxid);
        }

        let plan = if needs_snap {
            SyncPlan::snap(last_processed)
        } else {
            match out.into_plan(current) {
                Some(plan) => plan,
                None => {
                    // Every non-snapshot outcome must have queued a DIFF or
                    // TRUNC opener. Falling back to a snapshot is always safe.
                    tracing::error!(
                        "no DIFF or TRUNC queued for peer {}; falling back to snapshot",
                        peer_zxid
                    );
                    SyncPlan::snap(last_processed)
                }
            }
        };

        tracing::debug!("sync plan for peer {}: {}", peer_zxid, plan);

        #[cfg(debug_assertions)]
        if let Err(e) = validit::Validate::validate(&plan) {
            unreachable!("sync plan violates packet ordering invariants: {}", e);
        }

        Ok(plan)
    }
}

/// Walk an ordered proposal source and queue the DIFF-form stream for a peer.
///
/// Decides, at the first entry at or above `peer_zxid`, whether the plan
/// opens with DIFF (peer zxid found in our history, or the peer reports an
/// epoch-opening marker) or TRUNC (peer forked; roll back to the greatest
/// zxid below it). Entries are then shipped as (PROPOSAL, COMMIT) pairs in
/// strictly increasing zxid order, skipping duplicates, stopping after
/// `cutoff` when one is given.
///
/// Returns the zxid of the last queued proposal, or `peer_zxid` when nothing
/// was shipped. Returning with the opener still owed means the caller must
/// fall back to a snapshot: either the peer needs a truncation that would
/// cross an epoch boundary, or there is no anchor below it to truncate to.
fn queue_committed_proposals<I>(
    out: &mut PlanOutput,
    source: I,
    peer_zxid: Zxid,
    cutoff: Option<Zxid>,
    diff_anchor: Zxid,
) -> Result<Zxid, SyncError>
where
    I: Iterator<Item = Result<Proposal, LogReadError>>,
{
    let peer_is_epoch_open = peer_zxid.is_epoch_open();
    let mut queued = peer_zxid;
    // The greatest zxid below the peer seen so far: the TRUNC anchor.
    let mut prev: Option<Zxid> = None;

    for entry in source {
        let proposal = entry?;
        let zxid = proposal.zxid;

        if let Some(cutoff) = cutoff {
            if zxid > cutoff {
                break;
            }
        }

        // The peer already has everything below its own zxid.
        if zxid < peer_zxid {
            prev = Some(zxid);
            continue;
        }

        if out.needs_op_packet() {
            if zxid == peer_zxid {
                tracing::info!(
                    "peer zxid {} found in history; sending DIFF anchored at {}",
                    peer_zxid,
                    diff_anchor
                );
                out.queue_opener(PacketKind::Diff, diff_anchor);
                continue;
            }

            if peer_is_epoch_open {
                // The peer's zxid is a fresh epoch marker with no txn record;
                // there is nothing to truncate, diff from scratch.
                out.queue_opener(PacketKind::Diff, diff_anchor);
            } else {
                // zxid > peer_zxid: the peer holds proposals we never saw.
                if zxid.epoch() != peer_zxid.epoch() {
                    // A TRUNC across an epoch boundary cannot be replayed by
                    // the follower; the caller downgrades to a snapshot.
                    tracing::warn!(
                        "peer {} would need a TRUNC across epoch boundary into {}; snapshot instead",
                        peer_zxid,
                        zxid
                    );
                    return Ok(queued);
                }
                let trunc_to = match prev {
                    Some(prev) => prev,
                    None => {
                        tracing::warn!("no history below peer {} to anchor a TRUNC; snapshot instead", peer_zxid);
                        return Ok(queued);
                    }
                };
                tracing::info!("peer {} forked from our history; sending TRUNC to {}", peer_zxid, trunc_to);
                out.queue_opener(PacketKind::Trunc, trunc_to);
            }
        }

        if zxid <= queued {
            // A duplicate in the source, or an entry already shipped by an
            // earlier pass over the txn log.
            continue;
        }

        out.queue_committed(&proposal);
        queued = zxid;
    }

    Ok(queued)
}
