// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive actions and their queue records.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a queued interaction.
    pub struct QueueJobId("qjb-");
}

/// A one-shot action against the shared automation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Interaction {
    SendMessage {
        recipient: String,
        message: String,
    },
    AddConnection {
        profile: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    CreatePost {
        content: String,
    },
}

impl Interaction {
    /// Short action name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Interaction::SendMessage { .. } => "send-message",
            Interaction::AddConnection { .. } => "add-connection",
            Interaction::CreatePost { .. } => "create-post",
        }
    }
}

/// Queue job status. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Queued,
    Running,
    Done,
    Error,
}

crate::simple_display! {
    QueueJobStatus {
        Queued => "queued",
        Running => "running",
        Done => "done",
        Error => "error",
    }
}

impl QueueJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueJobStatus::Done | QueueJobStatus::Error)
    }
}

/// Observable record of one queued interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueJob {
    pub id: QueueJobId,
    /// Arrival order within the queue
    pub seq: u64,
    pub action: Interaction,
    pub status: QueueJobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub queued_at_ms: u64,
}

impl QueueJob {
    pub fn new(seq: u64, action: Interaction, queued_at_ms: u64) -> Self {
        Self {
            id: QueueJobId::random(),
            seq,
            action,
            status: QueueJobStatus::Queued,
            result: None,
            error: None,
            queued_at_ms,
        }
    }

    /// Advance the status. Backward transitions are ignored.
    pub fn advance(&mut self, status: QueueJobStatus) -> bool {
        if status <= self.status || self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
