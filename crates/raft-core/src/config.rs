//! # config
//!
//! why: validate construction parameters before a node exists
//! relations: consumed by node.rs in RaftNode::new
//! what: RaftConfig, defaults, json loading

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::NodeId;

/// Parameters for starting a raft node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaftConfig {
    /// Identity of the local node. Cannot be 0.
    pub id: NodeId,
    /// All voters including this node. Only set when bootstrapping a new
    /// cluster; on restart the voters come from storage.
    pub peers: Vec<NodeId>,
    /// Ticks without hearing from a leader before a follower campaigns. The
    /// actual timeout is randomized in `[election_tick, 2 * election_tick)`.
    pub election_tick: usize,
    /// Ticks between leader heartbeats.
    pub heartbeat_tick: usize,
    /// Last index applied to the state machine. Only set on restart.
    pub applied: u64,
}

impl Default for RaftConfig {
    fn default() -> Self {
        Self {
            id: 0,
            peers: Vec::new(),
            election_tick: 10,
            heartbeat_tick: 1,
            applied: 0,
        }
    }
}

impl RaftConfig {
    pub fn new(id: NodeId, peers: Vec<NodeId>) -> Self {
        Self {
            id,
            peers,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(Error::Config("cannot use 0 as node id".into()));
        }
        if self.heartbeat_tick == 0 {
            return Err(Error::Config(
                "heartbeat tick must be greater than 0".into(),
            ));
        }
        if self.election_tick <= self.heartbeat_tick {
            return Err(Error::Config(
                "election tick must be greater than heartbeat tick".into(),
            ));
        }
        if self.election_tick.checked_mul(2).is_none() {
            return Err(Error::Config(format!(
                "election tick {} is too large",
                self.election_tick
            )));
        }
        Ok(())
    }
}
