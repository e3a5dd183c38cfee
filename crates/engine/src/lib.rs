// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hv-engine: job orchestration, self-healing handoff, and the interaction queue

mod error;
mod gate;
mod orchestrator;
mod platform;
mod queue;
mod retry;
mod supervisor;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{ItemError, JobError};
pub use gate::{GateConfig, GateError, HealAuthorizationGate};
pub use orchestrator::{JobOrchestrator, JobOutcome, OrchestratorConfig};
pub use platform::{
    AutomationSession, EdgeWriter, EnumerationPage, Platform, PlatformError, ResolvedTarget,
    SinkError,
};
pub use queue::{InteractionQueue, QueueError, QueueTicket, DEFAULT_CONCURRENCY};
pub use retry::{
    remainder_from, EmptyPageTracker, ErrorRetryManager, FailedItem, RetryAttempt, RetryConfig,
    RetryVerdict,
};
pub use supervisor::{
    Escalation, ProcessLauncher, SupervisorError, WorkerLauncher, WorkerSupervisor,
    DEFAULT_MAX_HANDOFFS,
};
