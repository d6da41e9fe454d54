//! # error
//!
//! why: give every failure in the consensus core an explicit, typed outcome
//! relations: returned by node.rs and log.rs, produced by storage.rs implementations
//! what: Error, StorageError, Result alias

use thiserror::Error;

/// Failures surfaced by the log's backing storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The requested index lies past the last entry.
    #[error("log entry {0} is unavailable")]
    Unavailable(u64),

    /// The requested index lies below the first retained entry.
    #[error("log entry {0} has been compacted")]
    Compacted(u64),

    /// The backend failed to read or write.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors returned by raft-core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid construction parameters. Fatal.
    #[error("invalid raft config: {0}")]
    Config(String),

    /// The proposal was not accepted, usually because this node is not the leader.
    #[error("raft proposal dropped")]
    ProposalDropped,

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An append tried to overwrite an entry that is already committed.
    #[error("refusing to truncate committed entry {index} (committed {committed})")]
    CommittedTruncation { index: u64, committed: u64 },

    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
