//! # node
//!
//! why: define the raft node state machine and state transitions
//! relations: owns log.rs, progress.rs and quorum.rs state, speaks message.rs
//! what: NodeState enum, RaftNode struct, tick/step/propose, ready cycle

use std::collections::BTreeSet;
use std::mem;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RaftConfig;
use crate::error::{Error, Result, StorageError};
use crate::log::{EntryType, LogEntry, RaftLog};
use crate::message::{Message, RaftMessage};
use crate::progress::{Progress, ProgressTracker};
use crate::quorum::{self, VoteResult, VoteTally};
use crate::ready::{Ready, SoftState};
use crate::storage::{ConfState, HardState, Storage};
use crate::{NodeId, Term};

/// The three possible states a Raft node can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Passive state - listens for heartbeats, votes when asked
    Follower,
    /// Transitional state - requesting votes to become leader
    Candidate,
    /// Active state - manages log replication, sends heartbeats
    Leader,
}

impl Default for NodeState {
    fn default() -> Self {
        Self::Follower
    }
}

/// Role-specific state. Progress only exists while leading and is dropped
/// on any role change.
#[derive(Debug)]
enum Role {
    Follower,
    Candidate(VoteTally),
    Leader(ProgressTracker),
}

/// A single Raft node in the cluster
///
/// Driven entirely by `tick` and `step`. Outbound messages accumulate until
/// the caller collects them with `ready`.
#[derive(Debug)]
pub struct RaftNode<S> {
    id: NodeId,
    term: Term,
    vote: Option<NodeId>,
    lead: Option<NodeId>,
    voters: BTreeSet<NodeId>,
    log: RaftLog<S>,
    role: Role,
    msgs: Vec<Message>,

    heartbeat_timeout: usize,
    election_timeout: usize,
    randomized_election_timeout: usize,
    heartbeat_elapsed: usize,
    election_elapsed: usize,

    lead_transferee: Option<NodeId>,
    pending_conf_index: u64,

    prev_hard_state: HardState,
    prev_soft_state: SoftState,
    /// Set when bootstrapped from `RaftConfig::peers` until the voter set has
    /// been handed out in a `Ready`.
    conf_state_pending: bool,
    rng: StdRng,
}

impl<S: Storage> RaftNode<S> {
    /// Build a node from `config` and its recovered `storage`. Starts as a
    /// leaderless follower.
    pub fn new(config: RaftConfig, storage: S) -> Result<Self> {
        config.validate()?;
        let (hard_state, conf_state) = storage.initial_state()?;

        let bootstrap = !config.peers.is_empty();
        let voters: BTreeSet<NodeId> = match (config.peers.is_empty(), conf_state.voters.is_empty())
        {
            (false, false) => {
                return Err(Error::Config(
                    "peers must not be set when restarting with recovered voters".into(),
                ))
            }
            (true, true) => return Err(Error::Config("no voters configured".into())),
            (false, true) => config.peers.iter().copied().collect(),
            (true, false) => conf_state.voters.iter().copied().collect(),
        };
        if !voters.contains(&config.id) {
            return Err(Error::Config(format!(
                "node {} is not in its own voter set",
                config.id
            )));
        }

        let mut log = RaftLog::new(storage)?;
        if config.applied > log.committed() {
            return Err(Error::Config(format!(
                "applied index {} is beyond committed index {}",
                config.applied,
                log.committed()
            )));
        }
        log.restore_applied(config.applied);

        let mut node = Self {
            id: config.id,
            term: hard_state.term,
            vote: hard_state.vote,
            lead: None,
            voters,
            log,
            role: Role::Follower,
            msgs: Vec::new(),
            heartbeat_timeout: config.heartbeat_tick,
            election_timeout: config.election_tick,
            randomized_election_timeout: config.election_tick,
            heartbeat_elapsed: 0,
            election_elapsed: 0,
            lead_transferee: None,
            pending_conf_index: 0,
            prev_hard_state: hard_state,
            prev_soft_state: SoftState {
                lead: None,
                role: NodeState::Follower,
            },
            conf_state_pending: bootstrap,
            rng: StdRng::from_entropy(),
        };
        node.reset_randomized_election_timeout();

        info!(
            id = node.id,
            term = node.term,
            commit = node.log.committed(),
            applied = node.log.applied(),
            last_index = node.log.last_index(),
            voters = ?node.voters,
            "raft node started"
        );
        Ok(node)
    }

    // -- accessors --

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn vote(&self) -> Option<NodeId> {
        self.vote
    }

    pub fn state(&self) -> NodeState {
        match self.role {
            Role::Follower => NodeState::Follower,
            Role::Candidate(_) => NodeState::Candidate,
            Role::Leader(_) => NodeState::Leader,
        }
    }

    pub fn leader_id(&self) -> Option<NodeId> {
        self.lead
    }

    pub fn log(&self) -> &RaftLog<S> {
        &self.log
    }

    pub fn storage(&self) -> &S {
        self.log.storage()
    }

    /// The storage handle, for persisting what `ready` reports.
    pub fn storage_mut(&mut self) -> &mut S {
        self.log.storage_mut()
    }

    pub fn voters(&self) -> &BTreeSet<NodeId> {
        &self.voters
    }

    pub fn conf_state(&self) -> ConfState {
        ConfState::new(self.voters.iter().copied())
    }

    pub fn quorum_size(&self) -> usize {
        quorum::majority(self.voters.len())
    }

    /// Replication progress of `peer`, only while leading.
    pub fn progress(&self, peer: NodeId) -> Option<Progress> {
        match &self.role {
            Role::Leader(tracker) => tracker.get(peer).copied(),
            _ => None,
        }
    }

    /// Votes granted so far, only while campaigning.
    pub fn votes_granted(&self) -> Option<usize> {
        match &self.role {
            Role::Candidate(tally) => Some(tally.granted()),
            _ => None,
        }
    }

    pub fn lead_transferee(&self) -> Option<NodeId> {
        self.lead_transferee
    }

    pub fn pending_conf_index(&self) -> u64 {
        self.pending_conf_index
    }

    pub fn randomized_election_timeout(&self) -> usize {
        self.randomized_election_timeout
    }

    pub fn hard_state(&self) -> HardState {
        HardState {
            term: self.term,
            vote: self.vote,
            commit: self.log.committed(),
        }
    }

    pub fn soft_state(&self) -> SoftState {
        SoftState {
            lead: self.lead,
            role: self.state(),
        }
    }

    // -- client-facing operations --

    /// Advance the logical clock by a single tick.
    pub fn tick(&mut self) -> Result<()> {
        match self.role {
            Role::Leader(_) => {
                self.heartbeat_elapsed += 1;
                self.election_elapsed += 1;

                if self.election_elapsed >= self.election_timeout {
                    self.election_elapsed = 0;
                    if let Some(transferee) = self.lead_transferee.take() {
                        info!(
                            id = self.id,
                            term = self.term,
                            transferee,
                            "abandoning leadership transfer"
                        );
                    }
                }

                if self.heartbeat_elapsed >= self.heartbeat_timeout {
                    self.heartbeat_elapsed = 0;
                    self.step(Message::local(self.id, RaftMessage::Beat))?;
                }
            }
            Role::Follower | Role::Candidate(_) => {
                self.election_elapsed += 1;
                if self.election_elapsed >= self.randomized_election_timeout {
                    self.election_elapsed = 0;
                    self.step(Message::local(self.id, RaftMessage::Hup))?;
                }
            }
        }
        Ok(())
    }

    /// Start an election now, as if the election timeout had elapsed.
    pub fn campaign(&mut self) -> Result<()> {
        self.step(Message::local(self.id, RaftMessage::Hup))
    }

    /// Propose a client command. Fails with `ProposalDropped` unless leading.
    pub fn propose(&mut self, command: Vec<u8>) -> Result<()> {
        self.step(Message::local(
            self.id,
            RaftMessage::Propose {
                entries: vec![LogEntry::new(0, 0, command)],
            },
        ))
    }

    /// Propose a membership change entry. Only one may be pending at a time.
    pub fn propose_conf_change(&mut self, change: Vec<u8>) -> Result<()> {
        self.step(Message::local(
            self.id,
            RaftMessage::Propose {
                entries: vec![LogEntry::conf_change(0, 0, change)],
            },
        ))
    }

    /// Apply a committed membership change to the voter set.
    pub fn apply_conf_change(&mut self, _entry: &LogEntry) -> Result<()> {
        Err(Error::Unsupported("membership change"))
    }

    /// Ask the leader to hand leadership to `transferee`.
    pub fn transfer_leader(&mut self, transferee: NodeId) -> Result<()> {
        self.step(Message {
            from: transferee,
            to: self.id,
            term: 0,
            payload: RaftMessage::TransferLeader,
        })
    }

    /// Process one inbound or local message.
    pub fn step(&mut self, m: Message) -> Result<()> {
        if !m.payload.is_local() {
            if m.term > self.term {
                let lead = match m.payload {
                    RaftMessage::AppendEntries { .. }
                    | RaftMessage::Heartbeat { .. }
                    | RaftMessage::Snapshot { .. } => Some(m.from),
                    _ => None,
                };
                debug!(
                    id = self.id,
                    term = self.term,
                    msg_term = m.term,
                    from = m.from,
                    kind = m.payload.name(),
                    "received message with higher term"
                );
                self.become_follower(m.term, lead);
            } else if m.term < self.term {
                self.reply_to_stale(m);
                return Ok(());
            }
        }

        let from = m.from;
        match m.payload {
            RaftMessage::Hup => {
                if self.state() == NodeState::Leader {
                    debug!(id = self.id, "ignoring Hup, already leader");
                    return Ok(());
                }
                self.start_election()
            }
            RaftMessage::Beat => {
                if self.state() == NodeState::Leader {
                    self.bcast_heartbeat();
                }
                Ok(())
            }
            RaftMessage::Propose { entries } => self.handle_propose(entries),
            RaftMessage::VoteRequest {
                last_log_index,
                last_log_term,
            } => {
                self.handle_vote_request(from, last_log_index, last_log_term);
                Ok(())
            }
            RaftMessage::VoteResponse { reject } => self.handle_vote_response(from, reject),
            RaftMessage::AppendEntries {
                prev_log_index,
                prev_log_term,
                entries,
                leader_commit,
            } => {
                if !self.accept_leader(from, "AppendEntries") {
                    return Ok(());
                }
                self.handle_append_entries(
                    from,
                    prev_log_index,
                    prev_log_term,
                    entries,
                    leader_commit,
                )
            }
            RaftMessage::AppendEntriesResponse {
                reject,
                index,
                reject_hint,
            } => self.handle_append_response(from, reject, index, reject_hint),
            RaftMessage::Heartbeat { commit } => {
                if !self.accept_leader(from, "Heartbeat") {
                    return Ok(());
                }
                self.handle_heartbeat(from, commit);
                Ok(())
            }
            RaftMessage::HeartbeatResponse => self.handle_heartbeat_response(from),
            RaftMessage::Snapshot { index, term } => {
                if self.accept_leader(from, "Snapshot") {
                    warn!(
                        id = self.id,
                        from,
                        index,
                        snapshot_term = term,
                        "snapshot installation is not supported, dropping"
                    );
                }
                Ok(())
            }
            RaftMessage::TransferLeader => {
                self.handle_transfer_leader(from);
                Ok(())
            }
        }
    }

    // -- ready cycle --

    pub fn has_ready(&self) -> bool {
        !self.msgs.is_empty()
            || !self.log.unstable_entries().is_empty()
            || self.log.has_next_committed_entries()
            || self.hard_state() != self.prev_hard_state
            || self.soft_state() != self.prev_soft_state
            || self.conf_state_pending
    }

    /// Collect pending output. Messages are drained; entries and state are
    /// reported again until `advance` acknowledges them.
    pub fn ready(&mut self) -> Ready {
        let hard_state = self.hard_state();
        let soft_state = self.soft_state();
        Ready {
            soft_state: (soft_state != self.prev_soft_state).then_some(soft_state),
            hard_state: (hard_state != self.prev_hard_state).then_some(hard_state),
            conf_state: self.conf_state_pending.then(|| self.conf_state()),
            entries: self.log.unstable_entries().to_vec(),
            committed_entries: self.log.next_committed_entries().to_vec(),
            messages: mem::take(&mut self.msgs),
        }
    }

    /// Acknowledge that `ready` has been persisted and applied.
    pub fn advance(&mut self, ready: &Ready) {
        if let Some(hard_state) = ready.hard_state {
            self.prev_hard_state = hard_state;
        }
        if let Some(soft_state) = ready.soft_state {
            self.prev_soft_state = soft_state;
        }
        if ready.conf_state.is_some() {
            self.conf_state_pending = false;
        }
        if let Some(last) = ready.entries.last() {
            self.log.stable_to(last.index, last.term);
        }
        if let Some(last) = ready.committed_entries.last() {
            self.log.applied_to(last.index);
        }
    }

    // -- role transitions --

    fn reset(&mut self, term: Term) {
        if self.term != term {
            self.term = term;
            self.vote = None;
        }
        self.lead = None;
        self.election_elapsed = 0;
        self.heartbeat_elapsed = 0;
        self.lead_transferee = None;
        self.reset_randomized_election_timeout();
    }

    fn reset_randomized_election_timeout(&mut self) {
        self.randomized_election_timeout = self
            .rng
            .gen_range(self.election_timeout..2 * self.election_timeout);
    }

    fn become_follower(&mut self, term: Term, lead: Option<NodeId>) {
        self.reset(term);
        self.lead = lead;
        self.role = Role::Follower;
        info!(id = self.id, term = self.term, lead = ?lead, "became follower");
    }

    fn become_candidate(&mut self) {
        self.reset(self.term + 1);
        self.vote = Some(self.id);
        let mut tally = VoteTally::new();
        tally.record(self.id, true);
        self.role = Role::Candidate(tally);
        info!(id = self.id, term = self.term, "became candidate");
    }

    fn become_leader(&mut self) -> Result<()> {
        self.reset(self.term);
        self.lead = Some(self.id);
        let last_index = self.log.last_index();
        let peers = self.voters.iter().copied().filter(|&id| id != self.id);
        self.role = Role::Leader(ProgressTracker::new(peers, last_index));
        self.pending_conf_index = last_index;
        info!(id = self.id, term = self.term, "became leader");

        self.append_entries(vec![LogEntry::noop(0, 0)])
    }

    /// Take `from` as the leader of the current term. Returns false if the
    /// message must be ignored.
    fn accept_leader(&mut self, from: NodeId, kind: &'static str) -> bool {
        match self.role {
            Role::Leader(_) => {
                warn!(
                    id = self.id,
                    term = self.term,
                    from,
                    kind,
                    "leader received message from another leader of its term"
                );
                return false;
            }
            Role::Candidate(_) => self.become_follower(self.term, Some(from)),
            Role::Follower => {}
        }
        self.lead = Some(from);
        self.election_elapsed = 0;
        true
    }

    // -- election --

    fn start_election(&mut self) -> Result<()> {
        self.become_candidate();
        if let Role::Candidate(tally) = &self.role {
            if tally.tally(&self.voters) == VoteResult::Won {
                return self.become_leader();
            }
        }

        let last_log_index = self.log.last_index();
        let last_log_term = self.log.last_term();
        let peers: Vec<NodeId> = self.peers().collect();
        for peer in peers {
            self.send(
                peer,
                RaftMessage::VoteRequest {
                    last_log_index,
                    last_log_term,
                },
            );
        }
        Ok(())
    }

    fn handle_vote_request(&mut self, from: NodeId, last_log_index: u64, last_log_term: Term) {
        let can_vote = self.vote.is_none() || self.vote == Some(from);
        let up_to_date = self.log.is_up_to_date(last_log_index, last_log_term);

        if can_vote && up_to_date {
            self.vote = Some(from);
            self.election_elapsed = 0;
            debug!(id = self.id, term = self.term, candidate = from, "granted vote");
            self.send(from, RaftMessage::VoteResponse { reject: false });
        } else {
            debug!(
                id = self.id,
                term = self.term,
                candidate = from,
                vote = ?self.vote,
                up_to_date,
                "rejected vote"
            );
            self.send(from, RaftMessage::VoteResponse { reject: true });
        }
    }

    fn handle_vote_response(&mut self, from: NodeId, reject: bool) -> Result<()> {
        let Role::Candidate(tally) = &mut self.role else {
            return Ok(());
        };
        if !tally.record(from, !reject) {
            return Ok(());
        }
        match tally.tally(&self.voters) {
            VoteResult::Won => self.become_leader(),
            VoteResult::Lost => {
                debug!(id = self.id, term = self.term, "lost election");
                self.become_follower(self.term, None);
                Ok(())
            }
            VoteResult::Pending => Ok(()),
        }
    }

    // -- replication, leader side --

    fn handle_propose(&mut self, entries: Vec<LogEntry>) -> Result<()> {
        if self.state() != NodeState::Leader {
            debug!(
                id = self.id,
                term = self.term,
                lead = ?self.lead,
                "dropping proposal, not leader"
            );
            return Err(Error::ProposalDropped);
        }
        if let Some(transferee) = self.lead_transferee {
            debug!(id = self.id, transferee, "dropping proposal, leadership transfer pending");
            return Err(Error::ProposalDropped);
        }

        let conf_offset = entries
            .iter()
            .position(|e| e.entry_type == EntryType::ConfChange);
        if conf_offset.is_some() {
            let conf_changes = entries
                .iter()
                .filter(|e| e.entry_type == EntryType::ConfChange)
                .count();
            if conf_changes > 1 || self.pending_conf_index > self.log.applied() {
                debug!(
                    id = self.id,
                    pending_conf_index = self.pending_conf_index,
                    applied = self.log.applied(),
                    "dropping conf change, another one is pending"
                );
                return Err(Error::ProposalDropped);
            }
        }

        let first_index = self.log.last_index() + 1;
        self.append_entries(entries)?;
        if let Some(offset) = conf_offset {
            self.pending_conf_index = first_index + offset as u64;
        }
        Ok(())
    }

    /// Stamp `entries` with the current term and the next indices, append
    /// them locally and replicate.
    fn append_entries(&mut self, entries: Vec<LogEntry>) -> Result<()> {
        let term = self.term;
        let stamped: Vec<LogEntry> = entries
            .into_iter()
            .zip(self.log.last_index() + 1..)
            .map(|(mut entry, index)| {
                entry.term = term;
                entry.index = index;
                entry
            })
            .collect();
        let last_index = self.log.append(stamped);
        debug!(id = self.id, term, last_index, "appended entries");

        self.maybe_commit()?;
        self.bcast_append()
    }

    fn bcast_append(&mut self) -> Result<()> {
        let peers: Vec<NodeId> = self.peers().collect();
        for peer in peers {
            self.send_append(peer)?;
        }
        Ok(())
    }

    /// Send `peer` every entry from its next index on. Returns false if there
    /// is nothing to send.
    fn send_append(&mut self, peer: NodeId) -> Result<bool> {
        let next = match &self.role {
            Role::Leader(tracker) => match tracker.get(peer) {
                Some(pr) => pr.next,
                None => return Ok(false),
            },
            _ => return Ok(false),
        };

        let entries = self.log.entries_from(next).to_vec();
        if entries.is_empty() {
            return Ok(false);
        }
        let prev_log_index = next - 1;
        let prev_log_term = self.log.term(prev_log_index)?;

        self.send(
            peer,
            RaftMessage::AppendEntries {
                prev_log_index,
                prev_log_term,
                entries,
                leader_commit: self.log.committed(),
            },
        );
        Ok(true)
    }

    fn handle_append_response(
        &mut self,
        from: NodeId,
        reject: bool,
        index: u64,
        reject_hint: u64,
    ) -> Result<()> {
        let last_index = self.log.last_index();
        let Role::Leader(tracker) = &mut self.role else {
            return Ok(());
        };
        let Some(pr) = tracker.get_mut(from) else {
            return Ok(());
        };

        if reject {
            if pr.maybe_decr_to(index, reject_hint) {
                debug!(id = self.id, peer = from, next = pr.next, "append rejected, backing off");
                self.send_append(from)?;
            }
            return Ok(());
        }

        if index > last_index {
            warn!(id = self.id, peer = from, index, last_index, "ack beyond leader log, ignoring");
            return Ok(());
        }
        if !pr.maybe_update(index) {
            return Ok(());
        }
        let matched = pr.matched;

        self.maybe_commit()?;
        if matched < last_index {
            self.send_append(from)?;
        }
        Ok(())
    }

    /// Advance `committed` to the quorum index if that entry belongs to the
    /// current term.
    fn maybe_commit(&mut self) -> Result<bool> {
        let Role::Leader(tracker) = &self.role else {
            return Ok(false);
        };
        let index = tracker.quorum_index(self.log.last_index());
        if index <= self.log.committed() {
            return Ok(false);
        }

        let entry_term = self.log.term(index)?;
        if entry_term != self.term {
            debug!(
                id = self.id,
                term = self.term,
                index,
                entry_term,
                "quorum reached on entry from earlier term, not committing"
            );
            return Ok(false);
        }

        self.log.commit_to(index);
        debug!(id = self.id, term = self.term, committed = index, "commit index advanced");
        Ok(true)
    }

    fn bcast_heartbeat(&mut self) {
        let Role::Leader(tracker) = &self.role else {
            return;
        };
        let committed = self.log.committed();
        let beats: Vec<(NodeId, u64)> = tracker
            .iter()
            .map(|(peer, pr)| (peer, pr.matched.min(committed)))
            .collect();
        for (peer, commit) in beats {
            self.send(peer, RaftMessage::Heartbeat { commit });
        }
    }

    fn handle_heartbeat_response(&mut self, from: NodeId) -> Result<()> {
        let behind = match &self.role {
            Role::Leader(tracker) => tracker
                .get(from)
                .is_some_and(|pr| pr.matched < self.log.last_index()),
            _ => false,
        };
        if behind {
            self.send_append(from)?;
        }
        Ok(())
    }

    fn handle_transfer_leader(&mut self, transferee: NodeId) {
        match self.role {
            Role::Leader(_) => {
                if transferee == self.id {
                    debug!(id = self.id, "already leader, ignoring transfer to self");
                    return;
                }
                if !self.voters.contains(&transferee) {
                    debug!(id = self.id, transferee, "transfer target is not a voter");
                    return;
                }
                if self.lead_transferee == Some(transferee) {
                    return;
                }
                self.lead_transferee = Some(transferee);
                self.election_elapsed = 0;
                info!(
                    id = self.id,
                    term = self.term,
                    transferee,
                    "leadership transfer requested"
                );
            }
            Role::Follower | Role::Candidate(_) => match self.lead {
                Some(lead) => self.msgs.push(Message {
                    from: transferee,
                    to: lead,
                    term: 0,
                    payload: RaftMessage::TransferLeader,
                }),
                None => debug!(id = self.id, "no leader to forward transfer request to"),
            },
        }
    }

    // -- replication, follower side --

    fn handle_append_entries(
        &mut self,
        from: NodeId,
        prev_log_index: u64,
        prev_log_term: Term,
        entries: Vec<LogEntry>,
        leader_commit: u64,
    ) -> Result<()> {
        let contiguous = entries
            .iter()
            .enumerate()
            .all(|(pos, e)| prev_log_index.checked_add(pos as u64 + 1) == Some(e.index));
        if !contiguous {
            warn!(id = self.id, from, prev_log_index, "malformed append, entries not contiguous");
            self.reject_append(from, prev_log_index);
            return Ok(());
        }

        match self.log.term(prev_log_index) {
            Ok(term) if term == prev_log_term => {}
            Ok(_) | Err(StorageError::Unavailable(_)) => {
                debug!(
                    id = self.id,
                    from,
                    prev_log_index,
                    prev_log_term,
                    last_index = self.log.last_index(),
                    "rejecting append, log does not match"
                );
                self.reject_append(from, prev_log_index);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let last_new = self.log.maybe_append(prev_log_index, entries)?;
        self.log.commit_to(leader_commit.min(last_new));
        self.send(
            from,
            RaftMessage::AppendEntriesResponse {
                reject: false,
                index: last_new,
                reject_hint: 0,
            },
        );
        Ok(())
    }

    fn reject_append(&mut self, to: NodeId, prev_log_index: u64) {
        let reject_hint = self.log.last_index();
        self.send(
            to,
            RaftMessage::AppendEntriesResponse {
                reject: true,
                index: prev_log_index,
                reject_hint,
            },
        );
    }

    fn handle_heartbeat(&mut self, from: NodeId, commit: u64) {
        self.log.commit_to(commit);
        self.send(from, RaftMessage::HeartbeatResponse);
    }

    // -- helpers --

    /// Answer a message from an older term so its sender can catch up.
    fn reply_to_stale(&mut self, m: Message) {
        debug!(
            id = self.id,
            term = self.term,
            msg_term = m.term,
            from = m.from,
            kind = m.payload.name(),
            "stale message"
        );
        match m.payload {
            RaftMessage::AppendEntries { prev_log_index, .. } => {
                self.reject_append(m.from, prev_log_index)
            }
            RaftMessage::Heartbeat { .. } => self.send(m.from, RaftMessage::HeartbeatResponse),
            RaftMessage::VoteRequest { .. } => {
                self.send(m.from, RaftMessage::VoteResponse { reject: true })
            }
            _ => {}
        }
    }

    fn peers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.voters.iter().copied().filter(move |&id| id != self.id)
    }

    fn send(&mut self, to: NodeId, payload: RaftMessage) {
        self.msgs.push(Message {
            from: self.id,
            to,
            term: self.term,
            payload,
        });
    }
}
