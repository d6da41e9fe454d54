//! # raft-core
//!
//! why: implement the core raft consensus algorithm in pure, portable rust
//! relations: driven by a caller-owned tick loop and transport, persisted via raft-storage
//! what: state machine, election logic, log management, quorum commit, message types

pub mod config;
pub mod error;
pub mod log;
pub mod message;
pub mod node;
pub mod progress;
pub mod quorum;
pub mod ready;
pub mod storage;

/// A node identifier. 0 is reserved for "no node".
pub type NodeId = u64;

/// A logical epoch. 0 means no term has been observed yet.
pub type Term = u64;

pub use config::RaftConfig;
pub use error::{Error, Result, StorageError};
pub use log::{EntryType, LogEntry, RaftLog};
pub use message::{Message, RaftMessage};
pub use node::{NodeState, RaftNode};
pub use progress::{Progress, ProgressTracker};
pub use ready::{Ready, SoftState};
pub use storage::{ConfState, HardState, MemStorage, Storage};
