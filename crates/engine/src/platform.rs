// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator interfaces the engine drives.
//!
//! The target platform itself (page navigation, selectors, rate limits) lives
//! behind [`Platform`] and [`AutomationSession`]; classified contacts leave
//! through [`EdgeWriter`].

use async_trait::async_trait;
use hv_core::{ActivitySample, ContactRecord, Interaction, SearchFilters};
use hv_storage::{ContactLog, ContactLogError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the platform driver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// Credentials were rejected; never retried locally
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl PlatformError {
    pub fn is_auth(&self) -> bool {
        matches!(self, PlatformError::Auth(_))
    }
}

/// Canonical identifiers for a job's filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

/// One page of enumeration results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationPage {
    pub items: Vec<String>,
    /// The platform reports no pages after this one
    #[serde(default)]
    pub is_last: bool,
}

/// Read-side access to the target platform for search jobs.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn resolve_target(
        &self,
        credentials_ref: &str,
        filters: &SearchFilters,
    ) -> Result<ResolvedTarget, PlatformError>;

    async fn fetch_page(
        &self,
        target: &ResolvedTarget,
        role: Option<&str>,
        page: usize,
    ) -> Result<EnumerationPage, PlatformError>;

    /// Sample `index` (0 = most recent) of an item's interaction history.
    /// `None` once the history has no more pages.
    async fn activity_sample(
        &self,
        item_id: &str,
        index: usize,
    ) -> Result<Option<ActivitySample>, PlatformError>;
}

/// The single live, stateful session interactive actions run against.
///
/// Only [`InteractionQueue`](crate::InteractionQueue) holds one of these.
#[async_trait]
pub trait AutomationSession: Send + Sync + 'static {
    async fn perform(&self, action: &Interaction) -> Result<serde_json::Value, PlatformError>;
}

#[derive(Debug, Error)]
#[error("edge write failed: {0}")]
pub struct SinkError(pub String);

/// Write interface for positively classified contacts.
#[async_trait]
pub trait EdgeWriter: Send + Sync {
    async fn create_edge(&self, contact: &ContactRecord) -> Result<(), SinkError>;
}

impl From<ContactLogError> for SinkError {
    fn from(e: ContactLogError) -> Self {
        SinkError(e.to_string())
    }
}

#[async_trait]
impl EdgeWriter for ContactLog {
    async fn create_edge(&self, contact: &ContactRecord) -> Result<(), SinkError> {
        Ok(self.append(contact)?)
    }
}
