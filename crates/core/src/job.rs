// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job state: the unit of checkpointing.
//!
//! A [`JobState`] is created when a search job starts, mutated in place as the
//! job progresses, serialized into a checkpoint immediately before a worker
//! handoff, and deleted once a worker completes the job.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a job.
    pub struct JobId("job-");
}

crate::define_id! {
    /// Name of a durable checkpoint record.
    pub struct CheckpointRef("ckpt-");
}

crate::define_id! {
    /// Name of a durable, ordered list of item identifiers.
    pub struct ListRef("lst-");
}

/// Which stage a resumed job must re-enter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealPhase {
    #[default]
    None,
    Enumeration,
    ItemAnalysis,
}

crate::simple_display! {
    HealPhase {
        None => "none",
        Enumeration => "enumeration",
        ItemAnalysis => "item-analysis",
    }
}

/// States of the orchestrator's job state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobPhase {
    ResolvingTarget,
    Enumerating,
    Analyzing,
    Done,
    Failed,
}

crate::simple_display! {
    JobPhase {
        ResolvingTarget => "resolving-target",
        Enumerating => "enumerating",
        Analyzing => "analyzing",
        Done => "done",
        Failed => "failed",
    }
}

/// Target filters supplied with a search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Target entity name (e.g. a company)
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Checkpointable state of one search job.
///
/// `resume_index` is interpreted relative to `heal_phase`: a page number while
/// enumerating, an offset into the analysis list otherwise. It must never be
/// carried from one phase into another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    pub id: JobId,
    pub filters: SearchFilters,
    /// Reference to the operator's stored credentials, never the credentials themselves
    pub credentials_ref: String,
    #[serde(default)]
    pub resume_index: usize,
    /// Number of worker handoffs this job has gone through
    #[serde(default)]
    pub recursion_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_location_id: Option<String>,
    #[serde(default)]
    pub heal_phase: HealPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heal_reason: Option<String>,
    /// Remainder list to analyze when resuming mid-analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_list_ref: Option<ListRef>,
    /// Accumulated enumeration results, rewritten after every page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration_ref: Option<ListRef>,
    pub created_at_ms: u64,
}

impl JobState {
    pub fn new(filters: SearchFilters, credentials_ref: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: JobId::random(),
            filters,
            credentials_ref: credentials_ref.into(),
            resume_index: 0,
            recursion_count: 0,
            extracted_entity_id: None,
            extracted_location_id: None,
            heal_phase: HealPhase::None,
            heal_reason: None,
            partial_list_ref: None,
            enumeration_ref: None,
            created_at_ms: clock.epoch_ms(),
        }
    }

    /// Whether this state was handed over from a previous worker.
    pub fn is_resumed(&self) -> bool {
        self.heal_phase != HealPhase::None
    }

    /// Whether the target filters were already resolved by an earlier worker.
    pub fn filters_resolved(&self) -> bool {
        self.extracted_entity_id.is_some()
            && (self.filters.location.is_none() || self.extracted_location_id.is_some())
    }
}

crate::builder! {
    pub struct JobStateBuilder => JobState {
        into {
            id: JobId = "job-test",
            credentials_ref: String = "cred-test",
        }
        set {
            filters: SearchFilters = SearchFilters {
                target: "Acme".to_string(),
                role: Some("engineer".to_string()),
                location: None,
            },
            resume_index: usize = 0,
            recursion_count: u32 = 0,
            extracted_entity_id: Option<String> = None,
            extracted_location_id: Option<String> = None,
            heal_phase: HealPhase = HealPhase::None,
            heal_reason: Option<String> = None,
            partial_list_ref: Option<ListRef> = None,
            enumeration_ref: Option<ListRef> = None,
            created_at_ms: u64 = 1_000_000,
        }
    }
}

/// Aggregate result of a completed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    pub analyzed: usize,
    pub classified: usize,
    /// Percentage of analyzed items classified positive
    pub success_rate: f64,
}

impl JobStats {
    pub fn new(analyzed: usize, classified: usize) -> Self {
        let success_rate =
            if analyzed == 0 { 0.0 } else { classified as f64 * 100.0 / analyzed as f64 };
        Self { analyzed, classified, success_rate }
    }
}

impl std::fmt::Display for JobStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} analyzed, {} classified ({:.1}%)",
            self.analyzed, self.classified, self.success_rate
        )
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
