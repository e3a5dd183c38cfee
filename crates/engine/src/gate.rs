// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human authorization gate for resumed workers.
//!
//! A resumed worker opens a heal session before touching the target platform
//! and polls it until an operator authorizes or cancels it. Sessions are
//! durable files, so the operator can act from another process. The wait is
//! bounded: a session left pending past the ceiling is cancelled and the
//! worker fails. Pending sessions older than the ceiling belong to workers
//! that died mid-wait; they are expired whenever sessions are listed or opened.
//!
//! The store serializes writers with a blocking file lock, so the async paths
//! run store calls on the blocking pool.

use hv_core::{Clock, HealSession, HealSessionId, HealStatus, JobState};
use hv_storage::{HealStore, HealStoreError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Store(#[from] HealStoreError),
    #[error("heal session {0} was cancelled")]
    Cancelled(HealSessionId),
    #[error("heal session {0} still pending after {1:?}")]
    TimedOut(HealSessionId, Duration),
    #[error("heal store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Polling parameters for [`HealAuthorizationGate::wait_for_authorization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    pub poll_interval: Duration,
    /// Upper bound on a single wait
    pub max_wait: Duration,
    /// How long resolved sessions are kept before they are deleted
    pub retention: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(60 * 60),
            retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

fn ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub struct HealAuthorizationGate<C: Clock> {
    store: HealStore,
    config: GateConfig,
    clock: C,
}

impl<C: Clock> HealAuthorizationGate<C> {
    pub fn new(store: HealStore, config: GateConfig, clock: C) -> Self {
        Self { store, config, clock }
    }

    /// Run a store call on the blocking pool.
    async fn on_store<T, F>(&self, f: F) -> Result<T, GateError>
    where
        T: Send + 'static,
        F: FnOnce(&HealStore) -> Result<T, HealStoreError> + Send + 'static,
    {
        let store = self.store.clone();
        Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
    }

    /// Create a session for a resumed job. Operators on the auto-approve list
    /// get a session that is already authorized.
    pub async fn open(&self, state: &JobState) -> Result<HealSession, GateError> {
        let now = self.clock.epoch_ms();
        let (stale_cutoff, retention_cutoff) = self.cutoffs(now);
        let operator = state.credentials_ref.clone();
        let auto = self
            .on_store(move |store| {
                sweep(store, stale_cutoff, retention_cutoff, now)?;
                Ok(store.policy()?.allows(&operator))
            })
            .await?;
        let session = HealSession {
            id: HealSessionId::random(),
            job_id: state.id.clone(),
            operator: state.credentials_ref.clone(),
            heal_phase: state.heal_phase,
            heal_reason: state.heal_reason.clone(),
            status: if auto { HealStatus::Authorized } else { HealStatus::Pending },
            created_at_ms: now,
            resolved_at_ms: auto.then_some(now),
            auto_approved: auto,
        };
        let created = session.clone();
        self.on_store(move |store| store.create(&created)).await?;

        if auto {
            tracing::info!(session_id = %session.id, job_id = %state.id, "heal session auto-approved");
        } else {
            tracing::info!(
                session_id = %session.id,
                job_id = %state.id,
                heal_phase = %state.heal_phase,
                "heal session awaiting operator authorization"
            );
        }
        Ok(session)
    }

    /// Authorize a pending session. With `auto_approve`, later sessions for the
    /// same operator are authorized without asking.
    pub fn authorize(&self, id: &str, auto_approve: bool) -> Result<HealSession, GateError> {
        let session = self.store.resolve(id, HealStatus::Authorized, self.clock.epoch_ms())?;
        if auto_approve {
            self.store.allow_auto_approve(&session.operator)?;
        }
        tracing::info!(session_id = id, auto_approve, "heal session authorized");
        Ok(session)
    }

    pub fn cancel(&self, id: &str) -> Result<HealSession, GateError> {
        let session = self.store.resolve(id, HealStatus::Cancelled, self.clock.epoch_ms())?;
        tracing::info!(session_id = id, "heal session cancelled");
        Ok(session)
    }

    /// The session currently needing attention, if any. Expires orphaned
    /// sessions and prunes old decisions first.
    pub fn status(&self) -> Result<Option<HealSession>, GateError> {
        let now = self.clock.epoch_ms();
        let (stale_cutoff, retention_cutoff) = self.cutoffs(now);
        sweep(&self.store, stale_cutoff, retention_cutoff, now)?;
        Ok(self.store.pending()?)
    }

    /// A pending session older than `max_wait` plus one poll has outlived its
    /// worker's own timeout.
    fn cutoffs(&self, now: u64) -> (u64, u64) {
        let stale = now.saturating_sub(ms(self.config.max_wait).saturating_add(ms(self.config.poll_interval)));
        (stale, now.saturating_sub(ms(self.config.retention)))
    }

    /// Block until the session is authorized (Ok) or cancelled (Err).
    pub async fn wait_for_authorization(&self, id: &HealSessionId) -> Result<HealSession, GateError> {
        let started = tokio::time::Instant::now();
        loop {
            let session = {
                let id = id.clone();
                self.on_store(move |store| store.get(&id)).await?
            };
            match session.status {
                HealStatus::Authorized => return self.complete(id).await,
                HealStatus::Completed => return Ok(session),
                HealStatus::Cancelled => return Err(GateError::Cancelled(id.clone())),
                HealStatus::Pending => {}
            }

            let waited = started.elapsed();
            if waited >= self.config.max_wait {
                tracing::error!(session_id = %id, waited_secs = waited.as_secs(), "heal authorization timed out");
                // An operator may have resolved it between the read and now
                let now = self.clock.epoch_ms();
                let owned = id.clone();
                let resolved = self
                    .on_store(move |store| Ok(store.resolve(&owned, HealStatus::Cancelled, now)))
                    .await?;
                return match resolved {
                    Ok(_) => Err(GateError::TimedOut(id.clone(), waited)),
                    Err(HealStoreError::NotPending { status: HealStatus::Authorized, .. }) => {
                        self.complete(id).await
                    }
                    Err(HealStoreError::NotPending { .. }) => Err(GateError::Cancelled(id.clone())),
                    Err(e) => Err(e.into()),
                };
            }

            tokio::time::sleep(self.config.poll_interval.min(self.config.max_wait - waited)).await;
        }
    }

    async fn complete(&self, id: &HealSessionId) -> Result<HealSession, GateError> {
        let id = id.clone();
        self.on_store(move |store| store.complete(&id)).await
    }
}

fn sweep(store: &HealStore, stale_cutoff: u64, retention_cutoff: u64, now: u64) -> Result<(), HealStoreError> {
    for session in store.expire_pending(stale_cutoff, now)? {
        tracing::warn!(
            session_id = %session.id,
            job_id = %session.job_id,
            "expired heal session with no waiting worker"
        );
    }
    let pruned = store.prune_resolved(retention_cutoff)?;
    if pruned > 0 {
        tracing::debug!(pruned, "pruned resolved heal sessions");
    }
    Ok(())
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
