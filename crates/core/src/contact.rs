// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classified targets handed to the edge store.

use crate::activity::ActivityScore;
use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// A target that was analyzed and scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Opaque item identifier from enumeration
    pub item_id: String,
    pub job_id: JobId,
    pub target: String,
    pub score: u32,
    pub is_good_contact: bool,
    pub recorded_at_ms: u64,
}

impl ContactRecord {
    pub fn new(
        item_id: impl Into<String>,
        job_id: JobId,
        target: impl Into<String>,
        score: &ActivityScore,
        recorded_at_ms: u64,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            job_id,
            target: target.into(),
            score: score.score,
            is_good_contact: score.is_good_contact,
            recorded_at_ms,
        }
    }
}
