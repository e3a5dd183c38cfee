// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heal sessions: durable human sign-off records gating a resumed worker.

use crate::job::{HealPhase, JobId};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a heal session.
    pub struct HealSessionId("heal-");
}

/// Lifecycle of a heal session. Only `Pending` is non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealStatus {
    Pending,
    Authorized,
    Cancelled,
    Completed,
}

crate::simple_display! {
    HealStatus {
        Pending => "pending",
        Authorized => "authorized",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl HealStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, HealStatus::Pending)
    }
}

/// One wait for authorization. Never reused once it leaves `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealSession {
    pub id: HealSessionId,
    pub job_id: JobId,
    /// Operator context the auto-approve policy is keyed on
    pub operator: String,
    pub heal_phase: HealPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heal_reason: Option<String>,
    pub status: HealStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
    /// Set when the session was authorized by policy rather than by a person
    #[serde(default)]
    pub auto_approved: bool,
}
