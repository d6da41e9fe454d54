//! # ready
//!
//! why: hand the caller everything that changed since the last advance
//! relations: built by node.rs, drained by the driver loop
//! what: Ready batch, SoftState

use crate::log::LogEntry;
use crate::message::Message;
use crate::node::NodeState;
use crate::storage::{ConfState, HardState};
use crate::NodeId;

/// Volatile state worth reporting but never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftState {
    pub lead: Option<NodeId>,
    pub role: NodeState,
}

/// Output of one `RaftNode::ready` call.
///
/// The caller must persist `entries`, `hard_state` and `conf_state` before
/// sending `messages`, apply `committed_entries`, then call
/// `RaftNode::advance`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ready {
    pub soft_state: Option<SoftState>,
    pub hard_state: Option<HardState>,
    /// The voter set a freshly bootstrapped node was started with.
    pub conf_state: Option<ConfState>,
    /// New or rewritten entries to persist.
    pub entries: Vec<LogEntry>,
    /// Entries safe to apply to the state machine.
    pub committed_entries: Vec<LogEntry>,
    pub messages: Vec<Message>,
}

impl Ready {
    /// The commit index, if it changed.
    pub fn committed_index(&self) -> Option<u64> {
        self.hard_state.map(|hs| hs.commit)
    }

    pub fn is_empty(&self) -> bool {
        self.soft_state.is_none()
            && self.hard_state.is_none()
            && self.conf_state.is_none()
            && self.entries.is_empty()
            && self.committed_entries.is_empty()
            && self.messages.is_empty()
    }
}
