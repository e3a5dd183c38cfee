// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed heal sessions and the auto-approve policy.
//!
//! The worker waiting on a session and the operator resolving it run in
//! different processes, so every transition is a read-modify-write of the
//! session file under an exclusive lock on `<root>/.lock`.

use crate::fsutil::{is_safe_name, write_json_atomic};
use fs2::FileExt;
use hv_core::{HealSession, HealStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealStoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("heal session not found: {0}")]
    NotFound(String),
    #[error("heal session {id} is {status}, not pending")]
    NotPending { id: String, status: HealStatus },
}

/// Operators whose heal sessions are authorized without a human action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoApprovePolicy {
    #[serde(default)]
    pub operators: BTreeSet<String>,
}

impl AutoApprovePolicy {
    pub fn allows(&self, operator: &str) -> bool {
        self.operators.contains(operator)
    }
}

/// Durable heal session records.
///
/// Layout: `<root>/sessions/<id>.json`, `<root>/policy.json`, `<root>/.lock`.
#[derive(Debug, Clone)]
pub struct HealStore {
    root: PathBuf,
}

impl HealStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn session_path(&self, id: &str) -> Result<PathBuf, HealStoreError> {
        if !is_safe_name(id) {
            return Err(HealStoreError::NotFound(id.to_string()));
        }
        Ok(self.sessions_dir().join(format!("{id}.json")))
    }

    fn policy_path(&self) -> PathBuf {
        self.root.join("policy.json")
    }

    /// Hold an exclusive advisory lock for the duration of `f`.
    fn locked<T>(&self, f: impl FnOnce() -> Result<T, HealStoreError>) -> Result<T, HealStoreError> {
        fs::create_dir_all(&self.root)?;
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.root.join(".lock"))?;
        lock.lock_exclusive()?;
        let result = f();
        // Dropping the handle releases the lock too
        let _ = FileExt::unlock(&lock);
        result
    }

    pub fn create(&self, session: &HealSession) -> Result<(), HealStoreError> {
        let path = self.session_path(&session.id)?;
        self.locked(|| Ok(write_json_atomic(&path, session)?))
    }

    pub fn get(&self, id: &str) -> Result<HealSession, HealStoreError> {
        let path = self.session_path(id)?;
        read_session(&path)?.ok_or_else(|| HealStoreError::NotFound(id.to_string()))
    }

    /// Move a pending session to `status`. Fails if it already left `Pending`.
    pub fn resolve(
        &self,
        id: &str,
        status: HealStatus,
        resolved_at_ms: u64,
    ) -> Result<HealSession, HealStoreError> {
        let path = self.session_path(id)?;
        self.locked(|| {
            let mut session =
                read_session(&path)?.ok_or_else(|| HealStoreError::NotFound(id.to_string()))?;
            if !session.status.is_pending() {
                return Err(HealStoreError::NotPending { id: id.to_string(), status: session.status });
            }
            session.status = status;
            session.resolved_at_ms = Some(resolved_at_ms);
            write_json_atomic(&path, &session)?;
            Ok(session)
        })
    }

    /// Mark an authorized session as consumed by the worker that waited on it.
    pub fn complete(&self, id: &str) -> Result<HealSession, HealStoreError> {
        let path = self.session_path(id)?;
        self.locked(|| {
            let mut session =
                read_session(&path)?.ok_or_else(|| HealStoreError::NotFound(id.to_string()))?;
            if session.status == HealStatus::Authorized {
                session.status = HealStatus::Completed;
                write_json_atomic(&path, &session)?;
            }
            Ok(session)
        })
    }

    /// All sessions, newest first.
    pub fn sessions(&self) -> Result<Vec<HealSession>, HealStoreError> {
        let entries = match fs::read_dir(self.sessions_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_session(&path) {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping corrupt heal session");
                }
            }
        }
        sessions.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms).then_with(|| b.id.cmp(&a.id)));
        Ok(sessions)
    }

    /// Cancel pending sessions created before `cutoff_ms`. Nothing is still
    /// waiting on them, so they would otherwise be offered to operators forever.
    pub fn expire_pending(&self, cutoff_ms: u64, now_ms: u64) -> Result<Vec<HealSession>, HealStoreError> {
        self.locked(|| {
            let mut expired = Vec::new();
            for mut session in self.sessions()? {
                if !session.status.is_pending() || session.created_at_ms >= cutoff_ms {
                    continue;
                }
                session.status = HealStatus::Cancelled;
                session.resolved_at_ms = Some(now_ms);
                write_json_atomic(&self.session_path(&session.id)?, &session)?;
                expired.push(session);
            }
            Ok(expired)
        })
    }

    /// Delete resolved sessions whose decision is older than `cutoff_ms`.
    /// Returns how many were removed.
    pub fn prune_resolved(&self, cutoff_ms: u64) -> Result<usize, HealStoreError> {
        self.locked(|| {
            let mut removed = 0;
            for session in self.sessions()? {
                let resolved_at = match (session.status.is_pending(), session.resolved_at_ms) {
                    (false, Some(at)) => at,
                    _ => continue,
                };
                if resolved_at >= cutoff_ms {
                    continue;
                }
                match fs::remove_file(self.session_path(&session.id)?) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(removed)
        })
    }

    /// The newest session still awaiting a decision.
    pub fn pending(&self) -> Result<Option<HealSession>, HealStoreError> {
        Ok(self.sessions()?.into_iter().find(|s| s.status.is_pending()))
    }

    pub fn policy(&self) -> Result<AutoApprovePolicy, HealStoreError> {
        match fs::read(self.policy_path()) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(AutoApprovePolicy::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn allow_auto_approve(&self, operator: &str) -> Result<(), HealStoreError> {
        let path = self.policy_path();
        self.locked(|| {
            let mut policy = self.policy()?;
            if policy.operators.insert(operator.to_string()) {
                write_json_atomic(&path, &policy)?;
            }
            Ok(())
        })
    }
}

fn read_session(path: &Path) -> Result<Option<HealSession>, HealStoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_reader(io::BufReader::new(file))?))
}

#[cfg(test)]
#[path = "heal_tests.rs"]
mod tests;
