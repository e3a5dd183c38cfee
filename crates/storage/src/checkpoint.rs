// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint persistence for worker handoff.
//!
//! A checkpoint is a named JSON file holding one complete [`JobState`]. It is
//! written before a successor worker is launched, read exactly once by that
//! successor, and deleted once that successor completes or hands off. Failed workers
//! leave their checkpoint behind for inspection.
//!
//! Item lists (enumeration results and analysis remainders) live next to
//! checkpoints as separate named records.

use crate::fsutil::{is_safe_name, write_json_atomic};
use chrono::{DateTime, Utc};
use hv_core::{CheckpointRef, JobId, JobState, ListRef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current checkpoint schema version
pub const CURRENT_CHECKPOINT_VERSION: u32 = 1;

/// Errors that can occur in checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("checkpoint not found: {0}")]
    NotFound(String),
    #[error("list not found: {0}")]
    ListNotFound(String),
    #[error("invalid record name: {0:?}")]
    InvalidRef(String),
    #[error("unsupported checkpoint version {0}")]
    UnsupportedVersion(u32),
}

/// Durable store for job checkpoints and item lists.
pub trait CheckpointStore: Send + Sync {
    /// Persist `state` under a fresh name. Returns only once the record is durable.
    fn save(&self, state: &JobState) -> Result<CheckpointRef, CheckpointError>;

    fn load(&self, checkpoint: &CheckpointRef) -> Result<JobState, CheckpointError>;

    fn delete(&self, checkpoint: &CheckpointRef) -> Result<(), CheckpointError>;

    /// Checkpoint names, newest first.
    fn list(&self) -> Result<Vec<CheckpointRef>, CheckpointError>;

    /// Write (or replace) a named item list.
    fn save_list(&self, list: &ListRef, items: &[String]) -> Result<(), CheckpointError>;

    fn load_list(&self, list: &ListRef) -> Result<Vec<String>, CheckpointError>;

    fn delete_list(&self, list: &ListRef) -> Result<(), CheckpointError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(rename = "v")]
    version: u32,
    created_at: DateTime<Utc>,
    state: JobState,
}

#[derive(Debug, Serialize, Deserialize)]
struct ListFile {
    #[serde(rename = "v")]
    version: u32,
    created_at: DateTime<Utc>,
    items: Vec<String>,
}

/// Name of the enumeration accumulator list for a job. Stable across pages.
pub fn enumeration_list_ref(job_id: &JobId) -> ListRef {
    ListRef::new(format!("{}{}-enumeration", ListRef::PREFIX, job_id.suffix()))
}

/// Fresh name for an analysis remainder list.
pub fn remainder_list_ref(job_id: &JobId) -> ListRef {
    ListRef::new(format!("{}{}-remainder-{}", ListRef::PREFIX, job_id.suffix(), timestamp()))
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%3fZ").to_string()
}

/// Checkpoint store backed by a directory of JSON files.
///
/// Layout: `<root>/checkpoints/<ref>.json` and `<root>/lists/<ref>.json`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    checkpoints_dir: PathBuf,
    lists_dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self { checkpoints_dir: root.join("checkpoints"), lists_dir: root.join("lists") }
    }

    fn checkpoint_path(&self, checkpoint: &CheckpointRef) -> Result<PathBuf, CheckpointError> {
        if !is_safe_name(checkpoint) {
            return Err(CheckpointError::InvalidRef(checkpoint.to_string()));
        }
        Ok(self.checkpoints_dir.join(format!("{checkpoint}.json")))
    }

    fn list_path(&self, list: &ListRef) -> Result<PathBuf, CheckpointError> {
        if !is_safe_name(list) {
            return Err(CheckpointError::InvalidRef(list.to_string()));
        }
        Ok(self.lists_dir.join(format!("{list}.json")))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, state: &JobState) -> Result<CheckpointRef, CheckpointError> {
        let checkpoint = CheckpointRef::new(format!(
            "{}{}-{}-{}",
            CheckpointRef::PREFIX,
            timestamp(),
            state.id.suffix(),
            state.recursion_count
        ));
        let path = self.checkpoint_path(&checkpoint)?;
        let file = CheckpointFile {
            version: CURRENT_CHECKPOINT_VERSION,
            created_at: Utc::now(),
            state: state.clone(),
        };
        write_json_atomic(&path, &file)?;
        tracing::debug!(%checkpoint, job_id = %state.id, "checkpoint saved");
        Ok(checkpoint)
    }

    fn load(&self, checkpoint: &CheckpointRef) -> Result<JobState, CheckpointError> {
        let path = self.checkpoint_path(checkpoint)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckpointError::NotFound(checkpoint.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let file: CheckpointFile = serde_json::from_slice(&bytes)?;
        if file.version > CURRENT_CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion(file.version));
        }
        Ok(file.state)
    }

    fn delete(&self, checkpoint: &CheckpointRef) -> Result<(), CheckpointError> {
        let path = self.checkpoint_path(checkpoint)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<CheckpointRef>, CheckpointError> {
        let entries = match fs::read_dir(&self.checkpoints_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_suffix(".json").map(String::from)
            })
            .collect();
        // Names embed a sortable timestamp right after the prefix
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names.into_iter().map(CheckpointRef::new).collect())
    }

    fn save_list(&self, list: &ListRef, items: &[String]) -> Result<(), CheckpointError> {
        let path = self.list_path(list)?;
        let file =
            ListFile { version: CURRENT_CHECKPOINT_VERSION, created_at: Utc::now(), items: items.to_vec() };
        write_json_atomic(&path, &file)?;
        Ok(())
    }

    fn load_list(&self, list: &ListRef) -> Result<Vec<String>, CheckpointError> {
        let path = self.list_path(list)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckpointError::ListNotFound(list.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let file: ListFile = serde_json::from_slice(&bytes)?;
        Ok(file.items)
    }

    fn delete_list(&self, list: &ListRef) -> Result<(), CheckpointError> {
        let path = self.list_path(list)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
