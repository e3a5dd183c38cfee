// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint-and-handoff to a successor worker process.
//!
//! The successor receives only a checkpoint reference on its command line and
//! re-derives everything else from the durable record. The current process
//! never waits on it.

use hv_core::{CheckpointRef, HealPhase, JobState, ListRef};
use hv_storage::{CheckpointError, CheckpointStore};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;

/// Default ceiling on successive handoffs for one job.
pub const DEFAULT_MAX_HANDOFFS: u32 = 10;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to persist checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("handoff limit exceeded ({count} > {max})")]
    HandoffLimit { count: u32, max: u32 },
    #[error("failed to launch successor worker: {0}")]
    Launch(#[source] io::Error),
}

/// Why and where a job must be resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub phase: HealPhase,
    pub reason: String,
    pub resume_index: usize,
    pub partial_list_ref: Option<ListRef>,
}

impl Escalation {
    /// Restart enumeration at `resume_page`.
    pub fn enumeration(resume_page: usize, reason: impl Into<String>) -> Self {
        Self {
            phase: HealPhase::Enumeration,
            reason: reason.into(),
            resume_index: resume_page,
            partial_list_ref: None,
        }
    }

    /// Restart analysis at the head of a persisted remainder list.
    pub fn item_analysis(remainder: ListRef, reason: impl Into<String>) -> Self {
        Self {
            phase: HealPhase::ItemAnalysis,
            reason: reason.into(),
            resume_index: 0,
            partial_list_ref: Some(remainder),
        }
    }
}

/// Starts a successor worker for a checkpoint without waiting for it.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, checkpoint: &CheckpointRef) -> io::Result<()>;
}

/// Launches `<binary> worker --checkpoint <ref>` as a detached process.
///
/// The child gets null stdio and its own process group so it outlives the
/// parent and never receives the parent's terminal signals.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    binary: PathBuf,
}

impl ProcessLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, checkpoint: &CheckpointRef) -> io::Result<()> {
        let mut cmd = std::process::Command::new(&self.binary);
        cmd.arg("worker")
            .arg("--checkpoint")
            .arg(checkpoint.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = tokio::process::Command::from(cmd).spawn()?;
        let pid = child.id();
        tracing::info!(checkpoint = %checkpoint, ?pid, "successor worker launched");

        // Reap the child if this process is still around when it exits
        let checkpoint = checkpoint.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => tracing::debug!(%checkpoint, %status, "successor worker exited"),
                Err(e) => tracing::debug!(%checkpoint, error = %e, "failed to reap successor worker"),
            }
        });
        Ok(())
    }
}

/// Persists job state and hands it to a fresh worker.
#[derive(Clone)]
pub struct WorkerSupervisor {
    store: Arc<dyn CheckpointStore>,
    launcher: Arc<dyn WorkerLauncher>,
    max_handoffs: u32,
}

impl WorkerSupervisor {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        launcher: Arc<dyn WorkerLauncher>,
        max_handoffs: u32,
    ) -> Self {
        Self { store, launcher, max_handoffs }
    }

    /// Record the escalation on `state`, save it, then launch a successor.
    ///
    /// Nothing is launched unless the checkpoint is durable. Past the handoff
    /// limit the checkpoint is still written but no successor is started.
    pub fn checkpoint_and_handoff(
        &self,
        state: &mut JobState,
        escalation: Escalation,
    ) -> Result<CheckpointRef, SupervisorError> {
        state.heal_phase = escalation.phase;
        state.heal_reason = Some(escalation.reason);
        state.resume_index = escalation.resume_index;
        state.partial_list_ref = escalation.partial_list_ref;
        state.recursion_count += 1;

        let checkpoint = self.store.save(state)?;
        tracing::info!(
            job_id = %state.id,
            %checkpoint,
            heal_phase = %state.heal_phase,
            resume_index = state.resume_index,
            recursion_count = state.recursion_count,
            reason = state.heal_reason.as_deref().unwrap_or_default(),
            "checkpoint saved for handoff"
        );

        if state.recursion_count > self.max_handoffs {
            tracing::error!(
                job_id = %state.id,
                %checkpoint,
                max_handoffs = self.max_handoffs,
                "handoff limit exceeded, not launching successor"
            );
            return Err(SupervisorError::HandoffLimit {
                count: state.recursion_count,
                max: self.max_handoffs,
            });
        }

        self.launcher.launch(&checkpoint).map_err(SupervisorError::Launch)?;
        Ok(checkpoint)
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
