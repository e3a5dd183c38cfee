// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hv-core: domain types for the harvest job orchestrator

pub mod macros;

pub mod activity;
pub mod clock;
pub mod contact;
pub mod heal;
pub mod id;
pub mod job;
pub mod queue;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use activity::{
    ActivitySample, ActivityScan, ActivityScore, ActivityScorer, ScanStep, ScanStop, ScoreWeights,
    ScorerConfig,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use contact::ContactRecord;
pub use heal::{HealSession, HealSessionId, HealStatus};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobStateBuilder;
pub use job::{CheckpointRef, HealPhase, JobId, JobPhase, JobState, JobStats, ListRef, SearchFilters};
pub use queue::{Interaction, QueueJob, QueueJobId, QueueJobStatus};
