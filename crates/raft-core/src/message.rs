//! # message
//!
//! why: define every message a raft node consumes or emits
//! relations: produced and consumed by node.rs, serialized by the transport
//! what: Message envelope, RaftMessage payloads

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::log::LogEntry;
use crate::{NodeId, Term};

/// A routed message. Local messages (`Hup`, `Beat`, `Propose`,
/// `TransferLeader`) carry term 0 and skip term checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: NodeId,
    pub to: NodeId,
    pub term: Term,
    pub payload: RaftMessage,
}

impl Message {
    /// A message a node sends to itself.
    pub fn local(id: NodeId, payload: RaftMessage) -> Self {
        Self {
            from: id,
            to: id,
            term: 0,
            payload,
        }
    }
}

/// All possible Raft messages between nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaftMessage {
    /// Election timeout elapsed: start an election.
    Hup,
    /// Heartbeat timeout elapsed: leader broadcasts heartbeats.
    Beat,
    /// Client entries to append. Term and index are stamped by the leader.
    Propose { entries: Vec<LogEntry> },
    /// Request a vote during leader election
    VoteRequest {
        last_log_index: u64,
        last_log_term: Term,
    },
    /// Response to a vote request
    VoteResponse { reject: bool },
    /// Replicate log entries following `prev_log_index`
    AppendEntries {
        prev_log_index: u64,
        prev_log_term: Term,
        entries: Vec<LogEntry>,
        leader_commit: u64,
    },
    /// Response to AppendEntries.
    ///
    /// On success `index` is the last index covered by the request. On
    /// rejection it echoes the rejected `prev_log_index` and `reject_hint`
    /// carries the follower's last index.
    AppendEntriesResponse {
        reject: bool,
        index: u64,
        reject_hint: u64,
    },
    /// Leader liveness signal. `commit` never exceeds what the receiver is
    /// known to hold.
    Heartbeat { commit: u64 },
    HeartbeatResponse,
    /// Snapshot installation is not implemented; the message only passes
    /// through term handling.
    Snapshot { index: u64, term: Term },
    /// Ask the leader to hand leadership to `from`.
    TransferLeader,
}

impl RaftMessage {
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            RaftMessage::Hup
                | RaftMessage::Beat
                | RaftMessage::Propose { .. }
                | RaftMessage::TransferLeader
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            RaftMessage::Hup => "Hup",
            RaftMessage::Beat => "Beat",
            RaftMessage::Propose { .. } => "Propose",
            RaftMessage::VoteRequest { .. } => "VoteRequest",
            RaftMessage::VoteResponse { .. } => "VoteResponse",
            RaftMessage::AppendEntries { .. } => "AppendEntries",
            RaftMessage::AppendEntriesResponse { .. } => "AppendEntriesResponse",
            RaftMessage::Heartbeat { .. } => "Heartbeat",
            RaftMessage::HeartbeatResponse => "HeartbeatResponse",
            RaftMessage::Snapshot { .. } => "Snapshot",
            RaftMessage::TransferLeader => "TransferLeader",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}->{} term {}",
            self.payload.name(),
            self.from,
            self.to,
            self.term
        )
    }
}
