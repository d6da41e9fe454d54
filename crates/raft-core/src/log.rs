//! # log
//!
//! why: manage the append-only log of commands that raft replicates
//! relations: owned by node.rs, loaded from and mirrored into a storage.rs backend
//! what: LogEntry, EntryType, RaftLog with committed/applied/stabled watermarks

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{Error, Result, StorageError};
use crate::storage::Storage;
use crate::Term;

/// How the state machine should interpret an entry's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntryType {
    /// A client command.
    #[default]
    Normal,
    /// Appended by a new leader to commit an entry of its own term.
    Noop,
    /// A membership change request. Opaque to the core.
    ConfChange,
}

/// A single entry in the replicated log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The term when this entry was created
    pub term: Term,
    /// The index of this entry in the log (1-indexed)
    pub index: u64,
    #[serde(default)]
    pub entry_type: EntryType,
    /// The command to be applied to the state machine
    pub command: Vec<u8>,
}

impl LogEntry {
    /// Create a new log entry
    pub fn new(term: Term, index: u64, command: Vec<u8>) -> Self {
        Self {
            term,
            index,
            entry_type: EntryType::Normal,
            command,
        }
    }

    pub fn noop(term: Term, index: u64) -> Self {
        Self {
            term,
            index,
            entry_type: EntryType::Noop,
            command: Vec::new(),
        }
    }

    pub fn conf_change(term: Term, index: u64, command: Vec<u8>) -> Self {
        Self {
            term,
            index,
            entry_type: EntryType::ConfChange,
            command,
        }
    }
}

/// The in-memory view of one node's log.
///
/// Entries are kept contiguous from index 1. Three watermarks track how far
/// the caller has caught up:
/// - `stabled`: last index known to be persisted in storage
/// - `committed`: last index known to be replicated on a quorum
/// - `applied`: last index handed to the state machine
///
/// `applied <= committed <= last_index()` holds at all times.
#[derive(Debug)]
pub struct RaftLog<S> {
    storage: S,
    entries: Vec<LogEntry>,
    committed: u64,
    applied: u64,
    stabled: u64,
}

impl<S: Storage> RaftLog<S> {
    /// Load every persisted entry and the committed watermark from `storage`.
    pub fn new(storage: S) -> Result<Self> {
        let (hard_state, _) = storage.initial_state()?;
        let last = storage.last_index()?;
        let entries = if last == 0 {
            Vec::new()
        } else {
            storage.entries(1, last + 1)?
        };

        for (offset, entry) in entries.iter().enumerate() {
            if entry.index != offset as u64 + 1 {
                return Err(StorageError::Backend(format!(
                    "storage returned entry {} at position {}",
                    entry.index,
                    offset + 1
                ))
                .into());
            }
        }
        if hard_state.commit > last {
            return Err(StorageError::Backend(format!(
                "commit index {} is beyond last index {}",
                hard_state.commit, last
            ))
            .into());
        }

        Ok(Self {
            storage,
            entries,
            committed: hard_state.commit,
            applied: 0,
            stabled: last,
        })
    }
}

impl<S> RaftLog<S> {
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn stabled(&self) -> u64 {
        self.stabled
    }

    /// Returns the last log index, or 0 if the log is empty
    pub fn last_index(&self) -> u64 {
        self.entries.last().map(|e| e.index).unwrap_or(0)
    }

    /// Returns the term of the last entry, or 0 if empty
    pub fn last_term(&self) -> Term {
        self.entries.last().map(|e| e.term).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Term of the entry at `index`.
    ///
    /// Index 0 is the empty prefix and has term 0. Any index past the end is
    /// `Unavailable`, never a silent zero.
    pub fn term(&self, index: u64) -> std::result::Result<Term, StorageError> {
        if index == 0 {
            return Ok(0);
        }
        self.entry(index)
            .map(|e| e.term)
            .ok_or(StorageError::Unavailable(index))
    }

    pub fn entry(&self, index: u64) -> Option<&LogEntry> {
        if index == 0 {
            return None;
        }
        self.entries.get((index - 1) as usize)
    }

    /// All entries from `index` through the last one.
    pub fn entries_from(&self, index: u64) -> &[LogEntry] {
        let start = index.max(1) - 1;
        self.entries.get(start as usize..).unwrap_or(&[])
    }

    /// Entries not yet persisted to storage.
    pub fn unstable_entries(&self) -> &[LogEntry] {
        self.entries_from(self.stabled + 1)
    }

    /// Committed entries not yet handed to the state machine.
    pub fn next_committed_entries(&self) -> &[LogEntry] {
        let start = self.applied as usize;
        let end = self.committed as usize;
        &self.entries[start..end]
    }

    pub fn has_next_committed_entries(&self) -> bool {
        self.committed > self.applied
    }

    /// Whether a log ending at `(last_index, last_term)` is at least as up to
    /// date as this one.
    pub fn is_up_to_date(&self, last_index: u64, last_term: Term) -> bool {
        (last_term, last_index) >= (self.last_term(), self.last_index())
    }

    /// Append entries whose indices continue the log. Leader path only.
    pub fn append(&mut self, entries: Vec<LogEntry>) -> u64 {
        debug_assert!(entries
            .iter()
            .zip(self.last_index() + 1..)
            .all(|(e, index)| e.index == index));
        self.entries.extend(entries);
        self.last_index()
    }

    /// Follower path: merge entries that follow `prev_index`, which the caller
    /// has already matched against the leader.
    ///
    /// Entries already present with the same term are skipped. The first entry
    /// whose term differs truncates the local log from that index on. Returns
    /// the index of the last entry covered by `entries`.
    pub fn maybe_append(&mut self, prev_index: u64, entries: Vec<LogEntry>) -> Result<u64> {
        let last_new = prev_index + entries.len() as u64;

        for entry in entries {
            match self.term(entry.index) {
                Ok(term) if term == entry.term => continue,
                Ok(_) => {
                    if entry.index <= self.committed {
                        error!(
                            index = entry.index,
                            committed = self.committed,
                            "conflicting entry targets committed log prefix"
                        );
                        return Err(Error::CommittedTruncation {
                            index: entry.index,
                            committed: self.committed,
                        });
                    }
                    self.truncate_from(entry.index);
                    self.entries.push(entry);
                }
                Err(_) => self.entries.push(entry),
            }
        }

        Ok(last_new)
    }

    fn truncate_from(&mut self, index: u64) {
        self.entries.truncate((index - 1) as usize);
        self.stabled = self.stabled.min(index - 1);
    }

    /// Advance `committed` to `index`, clamped to the last local entry.
    /// Returns true if the watermark moved.
    pub fn commit_to(&mut self, index: u64) -> bool {
        let index = index.min(self.last_index());
        if index > self.committed {
            self.committed = index;
            true
        } else {
            false
        }
    }

    /// Record that entries through `index` (with `term`) are persisted.
    /// Ignored if the entry has since been rewritten.
    pub fn stable_to(&mut self, index: u64, term: Term) {
        if index > self.stabled && self.term(index) == Ok(term) {
            self.stabled = index;
        }
    }

    pub fn applied_to(&mut self, index: u64) {
        if index > self.applied && index <= self.committed {
            self.applied = index;
        }
    }

    /// Restore the applied watermark on restart.
    pub(crate) fn restore_applied(&mut self, applied: u64) {
        self.applied = applied.min(self.committed);
    }
}
