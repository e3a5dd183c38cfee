// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job state machine.
//!
//! Drives one job through `resolving-target → enumerating → analyzing → done`.
//! Transient failures are absorbed by the retry policies; escalations become a
//! checkpoint-and-handoff and the caller gets [`JobOutcome::HandedOff`]. A
//! resumed job clears the heal gate before it touches the platform.

use crate::error::{ItemError, JobError};
use crate::gate::HealAuthorizationGate;
use crate::platform::{EdgeWriter, Platform, ResolvedTarget};
use crate::retry::{
    remainder_from, EmptyPageTracker, ErrorRetryManager, RetryAttempt, RetryConfig, RetryVerdict,
};
use crate::supervisor::{Escalation, WorkerSupervisor};
use hv_core::{
    ActivityScore, ActivityScorer, CheckpointRef, Clock, ContactRecord, HealPhase, JobPhase,
    JobState, JobStats, ScanStep, ScorerConfig,
};
use hv_storage::{enumeration_list_ref, remainder_list_ref, CheckpointError, CheckpointStore};
use indexmap::IndexSet;
use std::sync::Arc;

/// Tunables for a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub scorer: ScorerConfig,
    pub retry: RetryConfig,
    pub page_start: usize,
    /// Last page requested, inclusive
    pub page_end: usize,
    /// Consecutive empty pages that trigger an enumeration handoff
    pub empty_page_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerConfig::default(),
            retry: RetryConfig::default(),
            page_start: 1,
            page_end: 100,
            empty_page_limit: 3,
        }
    }
}

/// How a run ended, short of failure.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(JobStats),
    /// A successor worker owns the job now
    HandedOff { checkpoint: CheckpointRef, phase: HealPhase },
}

enum Step<T> {
    Next(T),
    HandedOff(JobOutcome),
}

#[derive(Default)]
struct Tally {
    analyzed: usize,
    classified: usize,
}

impl Tally {
    fn count(&mut self, score: &ActivityScore) {
        self.analyzed += 1;
        if score.is_good_contact {
            self.classified += 1;
        }
    }
}

pub struct JobOrchestrator<C: Clock> {
    platform: Arc<dyn Platform>,
    edges: Arc<dyn EdgeWriter>,
    store: Arc<dyn CheckpointStore>,
    supervisor: WorkerSupervisor,
    gate: Arc<HealAuthorizationGate<C>>,
    scorer: ActivityScorer,
    config: OrchestratorConfig,
    clock: C,
}

impl<C: Clock> JobOrchestrator<C> {
    pub fn new(
        platform: Arc<dyn Platform>,
        edges: Arc<dyn EdgeWriter>,
        store: Arc<dyn CheckpointStore>,
        supervisor: WorkerSupervisor,
        gate: Arc<HealAuthorizationGate<C>>,
        config: OrchestratorConfig,
        clock: C,
    ) -> Self {
        Self {
            platform,
            edges,
            store,
            supervisor,
            gate,
            scorer: ActivityScorer::new(config.scorer),
            config,
            clock,
        }
    }

    /// Run `state` to completion or handoff. `state` is mutated in place.
    pub async fn run(&self, state: &mut JobState) -> Result<JobOutcome, JobError> {
        let result = self.run_phases(state).await;
        match &result {
            Ok(JobOutcome::Completed(stats)) => {
                tracing::info!(job_id = %state.id, phase = %JobPhase::Done, %stats, "job complete");
            }
            Ok(JobOutcome::HandedOff { checkpoint, phase }) => {
                tracing::info!(job_id = %state.id, %checkpoint, heal_phase = %phase, "job handed off");
            }
            Err(e) => {
                tracing::error!(job_id = %state.id, phase = %JobPhase::Failed, error = %e, "job failed");
            }
        }
        result
    }

    async fn run_phases(&self, state: &mut JobState) -> Result<JobOutcome, JobError> {
        if state.is_resumed() {
            let session = self.gate.open(state).await?;
            self.gate.wait_for_authorization(&session.id).await?;
        }

        tracing::info!(job_id = %state.id, phase = %JobPhase::ResolvingTarget, "job phase");
        let target = self.resolve_target(state).await?;

        let items = if state.heal_phase == HealPhase::ItemAnalysis {
            let list = state
                .partial_list_ref
                .clone()
                .ok_or_else(|| CheckpointError::ListNotFound("partial_list_ref".to_string()))?;
            self.store.load_list(&list)?
        } else {
            tracing::info!(job_id = %state.id, phase = %JobPhase::Enumerating, "job phase");
            match self.enumerate(state, &target).await? {
                Step::Next(items) => {
                    // Page offsets mean nothing to the analysis list
                    state.resume_index = 0;
                    items
                }
                Step::HandedOff(outcome) => return Ok(outcome),
            }
        };

        tracing::info!(
            job_id = %state.id,
            phase = %JobPhase::Analyzing,
            items = items.len(),
            resume_index = state.resume_index,
            "job phase"
        );
        match self.analyze(state, &items).await? {
            Step::Next(stats) => {
                self.cleanup_lists(state);
                Ok(JobOutcome::Completed(stats))
            }
            Step::HandedOff(outcome) => Ok(outcome),
        }
    }

    async fn resolve_target(&self, state: &mut JobState) -> Result<ResolvedTarget, JobError> {
        if let (true, Some(entity_id)) = (state.filters_resolved(), &state.extracted_entity_id) {
            tracing::debug!(job_id = %state.id, entity_id = %entity_id, "using cached target");
            return Ok(ResolvedTarget {
                entity_id: entity_id.clone(),
                location_id: state.extracted_location_id.clone(),
            });
        }

        let target = self.platform.resolve_target(&state.credentials_ref, &state.filters).await?;
        state.extracted_entity_id = Some(target.entity_id.clone());
        state.extracted_location_id = target.location_id.clone();
        tracing::info!(
            job_id = %state.id,
            entity_id = %target.entity_id,
            location_id = ?target.location_id,
            "target resolved"
        );
        Ok(target)
    }

    async fn enumerate(
        &self,
        state: &mut JobState,
        target: &ResolvedTarget,
    ) -> Result<Step<Vec<String>>, JobError> {
        let resuming = state.heal_phase == HealPhase::Enumeration;
        let stored = resuming && state.enumeration_ref.is_some();
        let list = state.enumeration_ref.get_or_insert_with(|| enumeration_list_ref(&state.id)).clone();

        let mut accumulated = if stored { self.store.load_list(&list)? } else { Vec::new() };
        let first_page =
            if resuming { state.resume_index.max(self.config.page_start) } else { self.config.page_start };
        let mut empty_pages = EmptyPageTracker::new(self.config.empty_page_limit);

        for page in first_page..=self.config.page_end {
            let result = match self
                .platform
                .fetch_page(target, state.filters.role.as_deref(), page)
                .await
            {
                Ok(result) => result,
                Err(e) if e.is_auth() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(job_id = %state.id, page, error = %e, "page fetch failed, skipping");
                    continue;
                }
            };

            let found = result.items.len();
            accumulated.extend(result.items);
            self.store.save_list(&list, &accumulated)?;
            tracing::debug!(job_id = %state.id, page, found, total = accumulated.len(), "page enumerated");

            if result.is_last || page == self.config.page_end {
                tracing::info!(job_id = %state.id, page, "reached declared end of results");
                break;
            }
            if let Some(resume_page) = empty_pages.record(page, found) {
                let reason = format!(
                    "{} consecutive empty pages ({resume_page}..={page})",
                    self.config.empty_page_limit.max(1)
                );
                tracing::warn!(job_id = %state.id, resume_page, "{reason}");
                let checkpoint = self
                    .supervisor
                    .checkpoint_and_handoff(state, Escalation::enumeration(resume_page, reason))?;
                return Ok(Step::HandedOff(JobOutcome::HandedOff {
                    checkpoint,
                    phase: HealPhase::Enumeration,
                }));
            }
        }

        let unique: IndexSet<String> = accumulated.into_iter().collect();
        Ok(Step::Next(unique.into_iter().collect()))
    }

    async fn analyze(&self, state: &mut JobState, items: &[String]) -> Result<Step<JobStats>, JobError> {
        let mut retries = ErrorRetryManager::new(self.config.retry);
        let mut tally = Tally::default();

        let mut index = state.resume_index;
        while index < items.len() {
            let item = &items[index];
            let error = match self.analyze_item(state, item).await {
                Ok(score) => {
                    tally.count(&score);
                    retries.record_success(item);
                    index += 1;
                    continue;
                }
                Err(e) => e,
            };
            if let ItemError::Platform(e) = &error {
                if e.is_auth() {
                    return Err(e.clone().into());
                }
            }
            tracing::warn!(job_id = %state.id, item = %item, index, error = %error, "item analysis failed");

            let job: &JobState = state;
            let verdict = retries
                .record_failure(item, index, move |id| async move { self.analyze_item(job, &id).await })
                .await;
            match verdict {
                RetryVerdict::Continue => {}
                RetryVerdict::Recovered(attempts) => {
                    tally_attempts(&attempts, &mut tally)?;
                }
                RetryVerdict::Escalate(attempts) => {
                    tally_attempts(&attempts, &mut tally)?;
                    let failed: Vec<_> = attempts.into_iter().map(|a| a.item).collect();
                    let remainder = remainder_from(items, &failed);
                    let list = remainder_list_ref(&state.id);
                    self.store.save_list(&list, &remainder)?;

                    let superseded = state.partial_list_ref.clone();
                    let reason = format!(
                        "{} consecutive item failures persisted after retry, {} items remain",
                        failed.len(),
                        remainder.len()
                    );
                    let checkpoint = self
                        .supervisor
                        .checkpoint_and_handoff(state, Escalation::item_analysis(list.clone(), reason))?;
                    if let Some(old) = superseded.filter(|old| *old != list) {
                        if let Err(e) = self.store.delete_list(&old) {
                            tracing::warn!(list = %old, error = %e, "failed to delete superseded list");
                        }
                    }
                    return Ok(Step::HandedOff(JobOutcome::HandedOff {
                        checkpoint,
                        phase: HealPhase::ItemAnalysis,
                    }));
                }
            }
            index += 1;
        }

        Ok(Step::Next(JobStats::new(tally.analyzed, tally.classified)))
    }

    /// Score one item, writing an edge if it classifies positive.
    async fn analyze_item(&self, job: &JobState, item_id: &str) -> Result<ActivityScore, ItemError> {
        let mut scan = self.scorer.scan();
        let mut sample_index = 0;
        let score = loop {
            let Some(sample) = self.platform.activity_sample(item_id, sample_index).await? else {
                break scan.finish();
            };
            match scan.push(sample) {
                ScanStep::Continue => sample_index += 1,
                ScanStep::Done(score) => break score,
            }
        };

        if score.is_good_contact {
            let contact = ContactRecord::new(
                item_id,
                job.id.clone(),
                job.filters.target.clone(),
                &score,
                self.clock.epoch_ms(),
            );
            self.edges.create_edge(&contact).await?;
        }
        tracing::debug!(
            job_id = %job.id,
            item = item_id,
            score = score.score,
            good = score.is_good_contact,
            stop = ?score.stop,
            "item scored"
        );
        Ok(score)
    }

    fn cleanup_lists(&self, state: &JobState) {
        for list in [&state.enumeration_ref, &state.partial_list_ref].into_iter().flatten() {
            if let Err(e) = self.store.delete_list(list) {
                tracing::warn!(job_id = %state.id, list = %list, error = %e, "failed to delete list");
            }
        }
    }
}

/// Count successful re-attempts. Rejected credentials end the job here too.
fn tally_attempts(
    attempts: &[RetryAttempt<ActivityScore, ItemError>],
    tally: &mut Tally,
) -> Result<(), JobError> {
    for attempt in attempts {
        match &attempt.result {
            Ok(score) => tally.count(score),
            Err(ItemError::Platform(e)) if e.is_auth() => return Err(e.clone().into()),
            Err(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
