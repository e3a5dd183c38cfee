// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consecutive-failure tracking for the analysis and enumeration phases.
//!
//! Counters are scoped to one phase of one process. They are never
//! checkpointed: a successor worker starts with a clean slate.

use std::future::Future;
use std::time::Duration;

/// Retry protocol parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Pause before re-attempting a batch of failed items
    pub cooldown: Duration,
    /// Consecutive failures that trigger the retry protocol
    pub max_consecutive: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { cooldown: Duration::from_secs(5 * 60), max_consecutive: 3 }
    }
}

/// An analysis item that failed, with its position in the list being walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub item_id: String,
    pub index: usize,
}

/// One re-attempt made by the retry protocol.
#[derive(Debug)]
pub struct RetryAttempt<T, E> {
    pub item: FailedItem,
    pub result: Result<T, E>,
}

/// What the caller should do after a failure was recorded.
#[derive(Debug)]
pub enum RetryVerdict<T, E> {
    /// Below the limit; move on to the next item
    Continue,
    /// The batch was retried and at least one item succeeded
    Recovered(Vec<RetryAttempt<T, E>>),
    /// Every retried item failed again; the job must restart from a checkpoint
    Escalate(Vec<RetryAttempt<T, E>>),
}

/// FIFO of consecutively failed items within the current process.
#[derive(Debug)]
pub struct ErrorRetryManager {
    config: RetryConfig,
    queue: Vec<FailedItem>,
}

impl ErrorRetryManager {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, queue: Vec::with_capacity(config.max_consecutive) }
    }

    /// Items currently counted as consecutive failures.
    pub fn pending(&self) -> &[FailedItem] {
        &self.queue
    }

    /// A success resets the consecutive-failure count entirely.
    pub fn record_success(&mut self, item_id: &str) {
        if !self.queue.is_empty() {
            tracing::debug!(item = item_id, cleared = self.queue.len(), "failure streak reset");
        }
        self.queue.clear();
    }

    /// Record a failure. When the FIFO fills up, snapshot and clear it, wait
    /// out the cool-down, then re-attempt each snapshotted item exactly once.
    ///
    /// Failures during the re-attempts are reported in the verdict and never
    /// feed back into the FIFO.
    pub async fn record_failure<T, E, F, Fut>(
        &mut self,
        item_id: &str,
        index: usize,
        mut retry: F,
    ) -> RetryVerdict<T, E>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.queue.push(FailedItem { item_id: item_id.to_string(), index });
        if self.queue.len() < self.config.max_consecutive.max(1) {
            return RetryVerdict::Continue;
        }

        let batch = std::mem::take(&mut self.queue);
        tracing::warn!(
            items = ?batch.iter().map(|f| f.item_id.as_str()).collect::<Vec<_>>(),
            cooldown_secs = self.config.cooldown.as_secs(),
            "consecutive failure limit reached, cooling down before retry"
        );
        tokio::time::sleep(self.config.cooldown).await;

        let mut attempts = Vec::with_capacity(batch.len());
        for item in batch {
            let result = retry(item.item_id.clone()).await;
            match &result {
                Ok(_) => tracing::info!(item = %item.item_id, "retry succeeded"),
                Err(e) => tracing::warn!(item = %item.item_id, error = %e, "retry failed"),
            }
            attempts.push(RetryAttempt { item, result });
        }

        if attempts.iter().any(|a| a.result.is_ok()) {
            RetryVerdict::Recovered(attempts)
        } else {
            RetryVerdict::Escalate(attempts)
        }
    }
}

/// Items still to analyze after an escalation, starting at the earliest failed item.
///
/// The earliest failure is located by its recorded index, checked against the
/// identifier at that position. If the list shifted underneath (the identifier
/// is elsewhere), the identifier's actual position wins. If it is gone
/// entirely, the recorded index is used as-is.
pub fn remainder_from(items: &[String], failed: &[FailedItem]) -> Vec<String> {
    let Some(earliest) = failed.iter().min_by_key(|f| f.index) else {
        return Vec::new();
    };

    let start = if items.get(earliest.index) == Some(&earliest.item_id) {
        earliest.index
    } else {
        items
            .iter()
            .position(|id| *id == earliest.item_id)
            .unwrap_or_else(|| earliest.index.min(items.len()))
    };
    items[start..].to_vec()
}

/// Tracks consecutive empty enumeration pages.
///
/// Page fetch errors are neither empty nor productive: they leave the streak
/// untouched.
#[derive(Debug)]
pub struct EmptyPageTracker {
    limit: usize,
    streak_start: Option<usize>,
    streak: usize,
}

impl EmptyPageTracker {
    pub fn new(limit: usize) -> Self {
        Self { limit: limit.max(1), streak_start: None, streak: 0 }
    }

    /// Record a fetched page. Returns the first page of the empty streak when
    /// the streak reaches the limit; the enumeration should resume there.
    pub fn record(&mut self, page: usize, item_count: usize) -> Option<usize> {
        if item_count > 0 {
            self.streak_start = None;
            self.streak = 0;
            return None;
        }

        let start = *self.streak_start.get_or_insert(page);
        self.streak += 1;
        if self.streak >= self.limit {
            self.streak_start = None;
            self.streak = 0;
            return Some(start);
        }
        None
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
