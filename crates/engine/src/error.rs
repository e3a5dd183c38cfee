// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-level errors.

use crate::gate::GateError;
use crate::platform::{PlatformError, SinkError};
use crate::supervisor::SupervisorError;
use hv_core::HealSessionId;
use hv_storage::CheckpointError;
use std::time::Duration;
use thiserror::Error;

/// Errors that end a job in the `failed` state.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("heal session {0} was cancelled by the operator")]
    Cancelled(HealSessionId),
    #[error("heal session {0} was not authorized within {1:?}")]
    AuthorizationTimeout(HealSessionId, Duration),
    #[error("heal gate error: {0}")]
    Gate(GateError),
    #[error("handoff limit reached ({0} handoffs)")]
    HandoffLimit(u32),
    #[error("handoff failed: {0}")]
    Supervisor(SupervisorError),
    #[error("platform error: {0}")]
    Platform(PlatformError),
}

impl From<GateError> for JobError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Cancelled(id) => JobError::Cancelled(id),
            GateError::TimedOut(id, waited) => JobError::AuthorizationTimeout(id, waited),
            other => JobError::Gate(other),
        }
    }
}

impl From<SupervisorError> for JobError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::HandoffLimit { count, .. } => JobError::HandoffLimit(count),
            SupervisorError::Checkpoint(e) => JobError::Checkpoint(e),
            other => JobError::Supervisor(other),
        }
    }
}

impl From<PlatformError> for JobError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::Auth(message) => JobError::Auth(message),
            other => JobError::Platform(other),
        }
    }
}

/// Failure analyzing a single item. Only auth failures escape the item loop.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl ItemError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ItemError::Platform(e) if e.is_auth())
    }
}
