//! # progress
//!
//! why: track how far each follower has replicated the leader's log
//! relations: owned by the leader role in node.rs, feeds quorum.rs
//! what: Progress cursor, ProgressTracker side table

use std::collections::BTreeMap;

use crate::quorum;
use crate::NodeId;

/// A follower's replication cursor as seen by the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Highest index known to be replicated on the follower.
    pub matched: u64,
    /// Index of the next entry to send.
    pub next: u64,
}

impl Progress {
    pub fn new(next: u64) -> Self {
        Self { matched: 0, next }
    }

    /// Apply a successful acknowledgement of `index`. Returns false if the
    /// acknowledgement is stale.
    pub fn maybe_update(&mut self, index: u64) -> bool {
        let updated = index > self.matched;
        if updated {
            self.matched = index;
        }
        self.next = self.next.max(index + 1);
        updated
    }

    /// Back off after the follower rejected an append at `rejected`.
    ///
    /// `hint` is the follower's last index. A rejection for anything other
    /// than the entry just before `next` is stale and ignored.
    pub fn maybe_decr_to(&mut self, rejected: u64, hint: u64) -> bool {
        if rejected.checked_add(1) != Some(self.next) {
            return false;
        }
        self.next = rejected.min(hint.saturating_add(1)).max(self.matched + 1);
        true
    }
}

/// Per-peer progress for one leadership term.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    progress: BTreeMap<NodeId, Progress>,
}

impl ProgressTracker {
    /// Fresh cursors for `peers`: nothing matched, probing from `last_index + 1`.
    pub fn new(peers: impl IntoIterator<Item = NodeId>, last_index: u64) -> Self {
        Self {
            progress: peers
                .into_iter()
                .map(|id| (id, Progress::new(last_index + 1)))
                .collect(),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Progress> {
        self.progress.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Progress> {
        self.progress.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Progress)> {
        self.progress.iter().map(|(&id, pr)| (id, pr))
    }

    /// Highest index replicated on a majority, counting the leader itself as
    /// having matched `leader_last_index`.
    pub fn quorum_index(&self, leader_last_index: u64) -> u64 {
        let mut matches: Vec<u64> = self.progress.values().map(|pr| pr.matched).collect();
        matches.push(leader_last_index);
        quorum::committed_index(&mut matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tracker_starts_past_leader_log() {
        let tracker = ProgressTracker::new([2, 3], 4);
        assert_eq!(tracker.get(2), Some(&Progress { matched: 0, next: 5 }));
        assert_eq!(tracker.get(3), Some(&Progress { matched: 0, next: 5 }));
        assert_eq!(tracker.get(1), None);
    }

    #[test]
    fn match_only_moves_forward() {
        let mut pr = Progress::new(1);
        assert!(pr.maybe_update(3));
        assert_eq!(pr, Progress { matched: 3, next: 4 });
        assert!(!pr.maybe_update(2));
        assert_eq!(pr, Progress { matched: 3, next: 4 });
    }

    #[test]
    fn rejection_backs_off_to_hint() {
        let mut pr = Progress::new(11);
        assert!(pr.maybe_decr_to(10, 4));
        assert_eq!(pr.next, 5);
    }

    #[test]
    fn rejection_without_hint_steps_back_one() {
        let mut pr = Progress::new(11);
        assert!(pr.maybe_decr_to(10, 20));
        assert_eq!(pr.next, 10);
    }

    #[test]
    fn stale_rejection_is_ignored() {
        let mut pr = Progress::new(11);
        assert!(!pr.maybe_decr_to(7, 0));
        assert_eq!(pr.next, 11);
    }

    #[test]
    fn rejection_at_max_index_is_ignored() {
        let mut pr = Progress::new(11);
        assert!(!pr.maybe_decr_to(u64::MAX, u64::MAX));
        assert_eq!(pr.next, 11);
    }

    #[test]
    fn rejection_never_rewinds_below_match() {
        let mut pr = Progress { matched: 5, next: 7 };
        assert!(pr.maybe_decr_to(6, 0));
        assert_eq!(pr.next, 6);
    }

    #[test]
    fn quorum_index_counts_leader() {
        let mut tracker = ProgressTracker::new([2, 3, 4, 5], 4);
        tracker.get_mut(2).unwrap().maybe_update(0);
        tracker.get_mut(3).unwrap().maybe_update(2);
        tracker.get_mut(4).unwrap().maybe_update(2);
        tracker.get_mut(5).unwrap().maybe_update(4);
        assert_eq!(tracker.quorum_index(4), 2);
    }
}
