//! # storage
//!
//! why: define what the consensus core needs from durable storage
//! relations: read by log.rs and node.rs on construction, implemented by raft-storage
//! what: Storage trait, HardState, ConfState, MemStorage for tests and embedding

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::log::LogEntry;
use crate::{NodeId, Term};

/// State that must survive a restart before any message depending on it is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardState {
    pub term: Term,
    pub vote: Option<NodeId>,
    pub commit: u64,
}

/// The voter set as recorded in storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfState {
    pub voters: Vec<NodeId>,
}

impl ConfState {
    pub fn new(voters: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            voters: voters.into_iter().collect(),
        }
    }
}

/// trait for durable storage of raft state
///
/// The core reads everything it needs through this trait when a node is
/// built. Writes are issued by the caller from what `RaftNode::ready` reports,
/// so the backend never has to guess what changed.
pub trait Storage {
    /// Recovered term, vote, commit index and voter set.
    fn initial_state(&self) -> Result<(HardState, ConfState), StorageError>;

    /// Entries in `[lo, hi)`.
    fn entries(&self, lo: u64, hi: u64) -> Result<Vec<LogEntry>, StorageError>;

    /// Term of the entry at `index`. Index 0 has term 0.
    fn term(&self, index: u64) -> Result<Term, StorageError>;

    fn last_index(&self) -> Result<u64, StorageError>;

    /// Persist `entries`, discarding any stored entries at or after the first
    /// appended index.
    fn append(&mut self, entries: &[LogEntry]) -> Result<(), StorageError>;

    fn set_hard_state(&mut self, hard_state: HardState) -> Result<(), StorageError>;

    fn set_conf_state(&mut self, conf_state: ConfState) -> Result<(), StorageError>;
}

/// in-memory storage for testing
///
/// stores all state in memory, no persistence across restarts
#[derive(Debug, Clone, Default)]
pub struct MemStorage {
    hard_state: HardState,
    conf_state: ConfState,
    entries: Vec<LogEntry>,
}

impl MemStorage {
    /// create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage for a restarted node that already knows its voters.
    pub fn with_conf_state(conf_state: ConfState) -> Self {
        Self {
            conf_state,
            ..Self::default()
        }
    }

    fn last(&self) -> u64 {
        self.entries.last().map(|e| e.index).unwrap_or(0)
    }
}

impl Storage for MemStorage {
    fn initial_state(&self) -> Result<(HardState, ConfState), StorageError> {
        Ok((self.hard_state, self.conf_state.clone()))
    }

    fn entries(&self, lo: u64, hi: u64) -> Result<Vec<LogEntry>, StorageError> {
        if lo == 0 {
            return Err(StorageError::Compacted(0));
        }
        if hi > self.last() + 1 {
            return Err(StorageError::Unavailable(hi - 1));
        }
        if lo >= hi {
            return Ok(Vec::new());
        }
        Ok(self.entries[(lo - 1) as usize..(hi - 1) as usize].to_vec())
    }

    fn term(&self, index: u64) -> Result<Term, StorageError> {
        if index == 0 {
            return Ok(0);
        }
        self.entries
            .get((index - 1) as usize)
            .map(|e| e.term)
            .ok_or(StorageError::Unavailable(index))
    }

    fn last_index(&self) -> Result<u64, StorageError> {
        Ok(self.last())
    }

    fn append(&mut self, entries: &[LogEntry]) -> Result<(), StorageError> {
        let Some(first) = entries.first() else {
            return Ok(());
        };
        if first.index == 0 || first.index > self.last() + 1 {
            return Err(StorageError::Backend(format!(
                "append at {} would leave a gap after {}",
                first.index,
                self.last()
            )));
        }
        self.entries.truncate((first.index - 1) as usize);
        self.entries.extend(entries.iter().cloned());
        Ok(())
    }

    fn set_hard_state(&mut self, hard_state: HardState) -> Result<(), StorageError> {
        self.hard_state = hard_state;
        Ok(())
    }

    fn set_conf_state(&mut self, conf_state: ConfState) -> Result<(), StorageError> {
        self.conf_state = conf_state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(range: std::ops::RangeInclusive<u64>, term: Term) -> Vec<LogEntry> {
        range.map(|i| LogEntry::new(term, i, vec![i as u8])).collect()
    }

    #[test]
    fn new_storage_has_default_values() {
        let storage = MemStorage::new();
        let (hard_state, conf_state) = storage.initial_state().unwrap();
        assert_eq!(hard_state, HardState::default());
        assert!(conf_state.voters.is_empty());
        assert_eq!(storage.last_index().unwrap(), 0);
    }

    #[test]
    fn append_truncates_conflicting_suffix() {
        let mut storage = MemStorage::new();
        storage.append(&entries(1..=3, 1)).unwrap();
        storage.append(&entries(2..=2, 2)).unwrap();

        assert_eq!(storage.last_index().unwrap(), 2);
        assert_eq!(storage.term(2).unwrap(), 2);
    }

    #[test]
    fn append_with_gap_is_rejected() {
        let mut storage = MemStorage::new();
        storage.append(&entries(1..=1, 1)).unwrap();
        assert!(matches!(
            storage.append(&entries(3..=3, 1)),
            Err(StorageError::Backend(_))
        ));
    }

    #[test]
    fn lookups_past_end_are_unavailable() {
        let mut storage = MemStorage::new();
        storage.append(&entries(1..=2, 1)).unwrap();

        assert_eq!(storage.term(3), Err(StorageError::Unavailable(3)));
        assert_eq!(storage.entries(1, 4), Err(StorageError::Unavailable(3)));
        assert_eq!(storage.entries(1, 3).unwrap().len(), 2);
    }

    #[test]
    fn hard_state_and_conf_state_round_trip() {
        let mut storage = MemStorage::new();
        let hard_state = HardState {
            term: 5,
            vote: Some(3),
            commit: 0,
        };
        storage.set_hard_state(hard_state).unwrap();
        storage.set_conf_state(ConfState::new([1, 2, 3])).unwrap();

        let (hs, cs) = storage.initial_state().unwrap();
        assert_eq!(hs, hard_state);
        assert_eq!(cs.voters, vec![1, 2, 3]);
    }
}
