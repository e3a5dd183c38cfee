// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hvd worker --checkpoint <ref>`: a successor worker resuming one job.

use crate::app::Engine;
use hv_core::CheckpointRef;
use hv_engine::{JobError, JobOutcome};
use hv_storage::CheckpointStore;

/// Worker process exit status. The codes are a stable, observable contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Job completed, or handed off to another successor
    Success,
    Failed,
    CheckpointLoad,
    Cancelled,
    AuthorizationTimeout,
}

hv_core::simple_display! {
    WorkerExit {
        Success => "success",
        Failed => "failed",
        CheckpointLoad => "checkpoint-load",
        Cancelled => "cancelled",
        AuthorizationTimeout => "authorization-timeout",
    }
}

impl WorkerExit {
    pub fn code(self) -> i32 {
        match self {
            WorkerExit::Success => 0,
            WorkerExit::Failed => 1,
            WorkerExit::CheckpointLoad => 3,
            WorkerExit::Cancelled => 4,
            WorkerExit::AuthorizationTimeout => 5,
        }
    }

    fn from_error(e: &JobError) -> Self {
        match e {
            JobError::Cancelled(_) => WorkerExit::Cancelled,
            JobError::AuthorizationTimeout(..) => WorkerExit::AuthorizationTimeout,
            _ => WorkerExit::Failed,
        }
    }
}

/// Load `checkpoint`, run the job, and consume the checkpoint on success.
///
/// A failed job leaves its checkpoint in place for inspection.
pub async fn run(engine: &Engine, checkpoint: &CheckpointRef) -> WorkerExit {
    let mut state = match engine.store.load(checkpoint) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(%checkpoint, error = %e, "failed to load checkpoint");
            return WorkerExit::CheckpointLoad;
        }
    };
    tracing::info!(
        %checkpoint,
        job_id = %state.id,
        heal_phase = %state.heal_phase,
        resume_index = state.resume_index,
        recursion_count = state.recursion_count,
        "worker resuming job"
    );

    let exit = match engine.orchestrator.run(&mut state).await {
        Ok(outcome) => {
            if let JobOutcome::Completed(stats) = &outcome {
                tracing::info!(job_id = %state.id, %stats, "worker finished job");
            }
            if let Err(e) = engine.store.delete(checkpoint) {
                tracing::warn!(%checkpoint, error = %e, "failed to delete consumed checkpoint");
            }
            WorkerExit::Success
        }
        Err(e) => WorkerExit::from_error(&e),
    };
    tracing::info!(%checkpoint, exit = %exit, code = exit.code(), "worker exiting");
    exit
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
