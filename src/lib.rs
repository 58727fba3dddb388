//! Leader-side follower synchronization for a ZAB-style replicated
//! coordination service.
//!
//! When a follower connects after an election, the leader must bring its
//! replicated log into a state consistent with the leader's committed
//! history before it can take part in broadcast. Given the follower's last
//! zxid, [`SyncDecider`] picks the cheapest correct recovery — DIFF,
//! TRUNC+DIFF, or a full snapshot — against one locked view of the
//! in-memory committed window, the on-disk txn log and the data tree state
//! id ([`LeaderLogView`]), and builds the exact packet sequence to hand to
//! the learner ([`learner::LearnerHandle`]).
//!
//! The crate also hosts the only other leader-resident control loop of the
//! service: [`reaper::ContainerReaper`], the periodic sweep that proposes
//! deletion of empty container znodes and expired TTL znodes.
#![allow(clippy::uninlined_format_args)]
#![deny(unused_qualifications)]

mod config;
mod packet;
mod proposal;
mod zxid;

pub mod clock;
pub mod error;
pub mod learner;
pub mod log_view;
pub mod reaper;
pub mod sync;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use anyerror;
pub use anyerror::AnyError;

pub use crate::config::Config;
pub use crate::config::ConfigError;
pub use crate::error::LogReadError;
pub use crate::error::SyncError;
pub use crate::learner::LearnerHandle;
pub use crate::learner::LearnerMsg;
pub use crate::log_view::CommittedWindow;
pub use crate::log_view::LeaderLogView;
pub use crate::log_view::TxnLogRead;
pub use crate::packet::PacketKind;
pub use crate::packet::QuorumPacket;
pub use crate::proposal::Proposal;
pub use crate::reaper::ContainerReaper;
pub use crate::sync::SyncDecider;
pub use crate::sync::SyncPlan;
pub use crate::sync::SyncStrategy;
pub use crate::zxid::Zxid;
