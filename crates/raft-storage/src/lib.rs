//! # raft-storage
//!
//! why: provide durable persistence for raft state using standard rust fs apis
//! relations: implements raft_core::Storage, fed by the caller from RaftNode::ready
//! what: FileStorage, a directory of json files written atomically

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use raft_core::{ConfState, HardState, LogEntry, Storage, StorageError, Term};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

const HARD_STATE_FILE: &str = "hard_state.json";
const CONF_STATE_FILE: &str = "conf_state.json";
const LOG_FILE: &str = "log.json";

/// file-based storage implementation using std::fs
///
/// stores raft state in a directory with:
/// - hard_state.json: term, vote and commit index
/// - conf_state.json: the voter set
/// - log.json: array of log entries
///
/// Every write replaces the whole file through a synced temp file and a
/// rename, so a crash leaves either the old or the new contents. Reads are
/// served from an in-memory copy loaded on open.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    hard_state: HardState,
    conf_state: ConfState,
    entries: Vec<LogEntry>,
}

impl FileStorage {
    /// Open the storage at `dir`, creating the directory if it doesn't exist
    /// and loading whatever state a previous run left behind.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let hard_state: HardState = read_json(&dir.join(HARD_STATE_FILE))?.unwrap_or_default();
        let conf_state: ConfState = read_json(&dir.join(CONF_STATE_FILE))?.unwrap_or_default();
        let entries: Vec<LogEntry> = read_json(&dir.join(LOG_FILE))?.unwrap_or_default();

        if let Some((pos, entry)) = entries
            .iter()
            .enumerate()
            .find(|(pos, e)| e.index != *pos as u64 + 1)
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("log entry at position {pos} has index {}", entry.index),
            ));
        }

        debug!(
            dir = %dir.display(),
            term = hard_state.term,
            commit = hard_state.commit,
            entries = entries.len(),
            "opened file storage"
        );
        Ok(Self {
            dir,
            hard_state,
            conf_state,
            entries,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// remove all persisted state
    pub fn clear(&mut self) -> io::Result<()> {
        for name in [HARD_STATE_FILE, CONF_STATE_FILE, LOG_FILE] {
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        self.hard_state = HardState::default();
        self.conf_state = ConfState::default();
        self.entries.clear();
        Ok(())
    }

    fn last(&self) -> u64 {
        self.entries.last().map(|e| e.index).unwrap_or(0)
    }

    /// atomic write: write to temp file then rename
    fn persist<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(value).map_err(|e| backend(name, e))?;

        let path = self.dir.join(name);
        let temp_path = path.with_extension("tmp");
        let write = || -> io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        };
        write().map_err(|e| backend(name, e))
    }
}

fn backend(name: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("{name}: {e}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

impl Storage for FileStorage {
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

        let mut log = self.entries[..(first.index - 1) as usize].to_vec();
        log.extend(entries.iter().cloned());
        self.persist(LOG_FILE, &log)?;

        debug!(
            first = first.index,
            last = first.index + entries.len() as u64 - 1,
            truncated = self.last() >= first.index,
            "persisted log entries"
        );
        self.entries = log;
        Ok(())
    }

    fn set_hard_state(&mut self, hard_state: HardState) -> Result<(), StorageError> {
        self.persist(HARD_STATE_FILE, &hard_state)?;
        self.hard_state = hard_state;
        Ok(())
    }

    fn set_conf_state(&mut self, conf_state: ConfState) -> Result<(), StorageError> {
        self.persist(CONF_STATE_FILE, &conf_state)?;
        self.conf_state = conf_state;
        Ok(())
    }
}
