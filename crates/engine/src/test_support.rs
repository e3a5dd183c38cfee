// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory collaborators for engine and daemon tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::platform::{
    AutomationSession, EdgeWriter, EnumerationPage, Platform, PlatformError, ResolvedTarget,
    SinkError,
};
use crate::supervisor::WorkerLauncher;
use async_trait::async_trait;
use hv_core::{ActivitySample, CheckpointRef, ContactRecord, Interaction, SearchFilters};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct PlatformState {
    auth_rejected: bool,
    pages: HashMap<usize, Result<EnumerationPage, PlatformError>>,
    histories: HashMap<String, Vec<ActivitySample>>,
    /// Remaining failures per item; `usize::MAX` never recovers
    failures: HashMap<String, usize>,
    auth_failures: HashSet<String>,
    resolve_calls: usize,
    fetched_pages: Vec<usize>,
    attempts: Vec<String>,
}

/// Scriptable [`Platform`]. Unscripted pages are empty; unscripted items have
/// no history.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, page: usize, items: &[&str]) -> Self {
        let items = items.iter().map(|s| s.to_string()).collect();
        self.state.lock().pages.insert(page, Ok(EnumerationPage { items, is_last: false }));
        self
    }

    pub fn with_last_page(self, page: usize, items: &[&str]) -> Self {
        let items = items.iter().map(|s| s.to_string()).collect();
        self.state.lock().pages.insert(page, Ok(EnumerationPage { items, is_last: true }));
        self
    }

    pub fn with_page_error(self, page: usize, error: PlatformError) -> Self {
        self.state.lock().pages.insert(page, Err(error));
        self
    }

    pub fn with_history(self, item: &str, samples: Vec<ActivitySample>) -> Self {
        self.state.lock().histories.insert(item.to_string(), samples);
        self
    }

    /// Fail the first `times` analysis attempts of `item`.
    pub fn failing(self, item: &str, times: usize) -> Self {
        self.state.lock().failures.insert(item.to_string(), times);
        self
    }

    pub fn always_failing(self, item: &str) -> Self {
        self.failing(item, usize::MAX)
    }

    /// Analysis of `item` reports rejected credentials.
    pub fn auth_failure_on(self, item: &str) -> Self {
        self.state.lock().auth_failures.insert(item.to_string());
        self
    }

    pub fn rejecting_credentials(self) -> Self {
        self.state.lock().auth_rejected = true;
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.state.lock().resolve_calls
    }

    pub fn fetched_pages(&self) -> Vec<usize> {
        self.state.lock().fetched_pages.clone()
    }

    /// Items in the order their analysis was attempted, retries included.
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().attempts.clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn resolve_target(
        &self,
        credentials_ref: &str,
        filters: &SearchFilters,
    ) -> Result<ResolvedTarget, PlatformError> {
        let mut state = self.state.lock();
        state.resolve_calls += 1;
        if state.auth_rejected {
            return Err(PlatformError::Auth(format!("credentials {credentials_ref} rejected")));
        }
        Ok(ResolvedTarget {
            entity_id: format!("ent-{}", filters.target.to_lowercase()),
            location_id: filters.location.as_ref().map(|l| format!("loc-{}", l.to_lowercase())),
        })
    }

    async fn fetch_page(
        &self,
        _target: &ResolvedTarget,
        _role: Option<&str>,
        page: usize,
    ) -> Result<EnumerationPage, PlatformError> {
        let mut state = self.state.lock();
        state.fetched_pages.push(page);
        state.pages.get(&page).cloned().unwrap_or_else(|| Ok(EnumerationPage::default()))
    }

    async fn activity_sample(
        &self,
        item_id: &str,
        index: usize,
    ) -> Result<Option<ActivitySample>, PlatformError> {
        let mut state = self.state.lock();
        if index == 0 {
            state.attempts.push(item_id.to_string());
            if state.auth_failures.contains(item_id) {
                return Err(PlatformError::Auth("session expired".to_string()));
            }
            if let Some(remaining) = state.failures.get_mut(item_id) {
                if *remaining > 0 {
                    if *remaining != usize::MAX {
                        *remaining -= 1;
                    }
                    return Err(PlatformError::Request(format!("{item_id} failed to load")));
                }
            }
        }
        Ok(state.histories.get(item_id).and_then(|h| h.get(index)).copied())
    }
}

/// Observed session activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started(Interaction),
    Finished(Interaction),
}

#[derive(Default)]
struct SessionState {
    running: usize,
    max_running: usize,
    events: Vec<SessionEvent>,
    fail_kinds: HashSet<&'static str>,
}

/// [`AutomationSession`] that records overlap between actions.
///
/// Clones share state, so a test can keep a handle after handing the session
/// to a queue.
#[derive(Clone, Default)]
pub struct FakeSession {
    delay: Duration,
    state: Arc<Mutex<SessionState>>,
}

impl FakeSession {
    pub fn new(delay: Duration) -> Self {
        Self { delay, state: Arc::default() }
    }

    /// Fail every action of this kind (e.g. `"create-post"`).
    pub fn failing_on(self, kind: &'static str) -> Self {
        self.state.lock().fail_kinds.insert(kind);
        self
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.state.lock().events.clone()
    }

    /// Highest number of actions observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.state.lock().max_running
    }
}

#[async_trait]
impl AutomationSession for FakeSession {
    async fn perform(&self, action: &Interaction) -> Result<serde_json::Value, PlatformError> {
        {
            let mut state = self.state.lock();
            state.running += 1;
            state.max_running = state.max_running.max(state.running);
            state.events.push(SessionEvent::Started(action.clone()));
        }
        tokio::time::sleep(self.delay).await;

        let mut state = self.state.lock();
        state.running -= 1;
        state.events.push(SessionEvent::Finished(action.clone()));
        if state.fail_kinds.contains(action.kind()) {
            return Err(PlatformError::Request(format!("{} failed", action.kind())));
        }
        Ok(serde_json::json!({ "performed": action.kind() }))
    }
}

/// [`WorkerLauncher`] that records checkpoint refs instead of spawning.
#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<CheckpointRef>>,
    fail: bool,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn launched(&self) -> Vec<CheckpointRef> {
        self.launched.lock().clone()
    }
}

impl WorkerLauncher for RecordingLauncher {
    fn launch(&self, checkpoint: &CheckpointRef) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "worker binary missing"));
        }
        self.launched.lock().push(checkpoint.clone());
        Ok(())
    }
}

/// [`EdgeWriter`] that keeps contacts in memory.
#[derive(Default)]
pub struct MemoryEdgeWriter {
    edges: Mutex<Vec<ContactRecord>>,
    fail_items: HashSet<String>,
}

impl MemoryEdgeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, item: &str) -> Self {
        self.fail_items.insert(item.to_string());
        self
    }

    pub fn edges(&self) -> Vec<ContactRecord> {
        self.edges.lock().clone()
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.edges.lock().iter().map(|c| c.item_id.clone()).collect()
    }
}

#[async_trait]
impl EdgeWriter for MemoryEdgeWriter {
    async fn create_edge(&self, contact: &ContactRecord) -> Result<(), SinkError> {
        if self.fail_items.contains(&contact.item_id) {
            return Err(SinkError(format!("store rejected {}", contact.item_id)));
        }
        self.edges.lock().push(contact.clone());
        Ok(())
    }
}
