//! # quorum
//!
//! why: centralize every "does a majority agree" decision
//! relations: used by node.rs for elections, progress.rs for commit advancement
//! what: majority size, VoteTally, quorum commit index over match values

use std::collections::{BTreeSet, HashMap};

use crate::NodeId;

/// Number of voters that form a strict majority of `voters`.
pub fn majority(voters: usize) -> usize {
    voters / 2 + 1
}

/// The highest index that at least a majority of `matches` have reached.
///
/// `matches` holds one match index per voter and is sorted in place.
pub fn committed_index(matches: &mut [u64]) -> u64 {
    if matches.is_empty() {
        return 0;
    }
    matches.sort_unstable();
    matches[matches.len() - majority(matches.len())]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteResult {
    /// Not enough responses yet.
    Pending,
    Won,
    /// Enough rejections that a majority can no longer be reached.
    Lost,
}

/// Votes collected by a candidate during one term.
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    votes: HashMap<NodeId, bool>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a voter's response. Only the first response per voter counts.
    /// Returns false for a repeated response.
    pub fn record(&mut self, voter: NodeId, granted: bool) -> bool {
        if self.votes.contains_key(&voter) {
            return false;
        }
        self.votes.insert(voter, granted);
        true
    }

    pub fn granted(&self) -> usize {
        self.votes.values().filter(|&&granted| granted).count()
    }

    pub fn tally(&self, voters: &BTreeSet<NodeId>) -> VoteResult {
        let (mut granted, mut rejected) = (0, 0);
        for (voter, &vote) in &self.votes {
            if !voters.contains(voter) {
                continue;
            }
            if vote {
                granted += 1;
            } else {
                rejected += 1;
            }
        }

        let quorum = majority(voters.len());
        if granted >= quorum {
            VoteResult::Won
        } else if rejected > voters.len() - quorum {
            VoteResult::Lost
        } else {
            VoteResult::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voters(ids: &[NodeId]) -> BTreeSet<NodeId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn majority_sizes() {
        assert_eq!(majority(1), 1);
        assert_eq!(majority(2), 2);
        assert_eq!(majority(3), 2);
        assert_eq!(majority(4), 3);
        assert_eq!(majority(5), 3);
        assert_eq!(majority(7), 4);
    }

    #[test]
    fn five_node_commit_index() {
        let mut matches = [4, 0, 2, 4, 2];
        assert_eq!(committed_index(&mut matches), 2);
    }

    #[test]
    fn commit_index_of_even_cluster_needs_strict_majority() {
        let mut matches = [5, 5, 1, 1];
        assert_eq!(committed_index(&mut matches), 1);
        let mut matches = [5, 5, 5, 1];
        assert_eq!(committed_index(&mut matches), 5);
    }

    #[test]
    fn single_voter_commits_its_own_match() {
        assert_eq!(committed_index(&mut [7]), 7);
        assert_eq!(committed_index(&mut []), 0);
    }

    #[test]
    fn duplicate_votes_count_once() {
        let mut tally = VoteTally::new();
        assert!(tally.record(1, true));
        assert!(tally.record(2, true));
        assert!(!tally.record(2, true));
        assert_eq!(tally.granted(), 2);
        assert_eq!(tally.tally(&voters(&[1, 2, 3, 4, 5])), VoteResult::Pending);
    }

    #[test]
    fn tally_wins_and_loses() {
        let all = voters(&[1, 2, 3]);

        let mut tally = VoteTally::new();
        tally.record(1, true);
        tally.record(2, true);
        assert_eq!(tally.tally(&all), VoteResult::Won);

        let mut tally = VoteTally::new();
        tally.record(1, true);
        tally.record(2, false);
        assert_eq!(tally.tally(&all), VoteResult::Pending);
        tally.record(3, false);
        assert_eq!(tally.tally(&all), VoteResult::Lost);
    }

    #[test]
    fn votes_from_non_voters_are_ignored() {
        let mut tally = VoteTally::new();
        tally.record(1, true);
        tally.record(9, true);
        assert_eq!(tally.tally(&voters(&[1, 2, 3])), VoteResult::Pending);
    }
}
