//! Message-passing boundary between the leader and a learner handler.
//!
//! The leader never holds the handler object itself; it holds a
//! [`LearnerHandle`] and sends packets and the forward-from handoff through
//! it. The handler side drains the channel from its transport thread, which
//! keeps the packet queue single-producer single-consumer and avoids any
//! shared mutable graph between the two.

use tokio::sync::mpsc;

use crate::QuorumPacket;
use crate::Zxid;
use crate::error::LearnerGone;
use crate::sync::SyncPlan;

/// What the leader tells a learner handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnerMsg {
    /// Queue a packet for transmission, in order.
    EnqueuePacket(QuorumPacket),
    /// The sync packets are queued; live forwarding must resume with every
    /// committed proposal whose zxid is greater than this.
    NotifyForwardFrom(Zxid),
}

/// Create the channel pair for one learner handler.
pub fn learner_channel() -> (LearnerHandle, mpsc::UnboundedReceiver<LearnerMsg>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LearnerHandle { tx }, rx)
}

/// The leader-held sending side of a learner handler's queue.
#[derive(Debug, Clone)]
pub struct LearnerHandle {
    tx: mpsc::UnboundedSender<LearnerMsg>,
}

impl LearnerHandle {
    pub fn enqueue(&self, packet: QuorumPacket) -> Result<(), LearnerGone> {
        self.tx.send(LearnerMsg::EnqueuePacket(packet)).map_err(|_| LearnerGone)
    }

    pub fn notify_forward_from(&self, zxid: Zxid) -> Result<(), LearnerGone> {
        self.tx.send(LearnerMsg::NotifyForwardFrom(zxid)).map_err(|_| LearnerGone)
    }

    /// Hand a finished sync plan to the learner: every packet in order,
    /// then the forward-from notification.
    ///
    /// A snapshot plan queues no packets; the notification alone tells the
    /// handler where live forwarding resumes once the snapshot is streamed.
    pub fn dispatch_plan(&self, plan: &SyncPlan) -> Result<(), LearnerGone> {
        tracing::debug!("dispatching {} to learner", plan);

        for packet in &plan.packets {
            self.enqueue(packet.clone())?;
        }
        self.notify_forward_from(plan.forward_from)
    }
}
