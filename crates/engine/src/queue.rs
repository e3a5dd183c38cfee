// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FIFO serializer for interactive actions against the shared automation session.
//!
//! The queue takes ownership of the session and exposes no accessor, so every
//! action goes through [`InteractionQueue::submit`]. Jobs start in arrival
//! order; with the default concurrency of 1 a job starts only after the
//! previous one finished.
//!
//! Concurrency above 1 lets actions interleave on the one session. That is
//! only sound if each concurrent job gets its own isolated session, which this
//! queue does not provide.

use crate::platform::AutomationSession;
use hv_core::{Clock, Interaction, QueueJob, QueueJobId, QueueJobStatus};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Semaphore};

pub const DEFAULT_CONCURRENCY: usize = 1;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("interaction queue is closed")]
    Closed,
    #[error("action failed: {0}")]
    Action(String),
    #[error("queue job was dropped before completing")]
    Dropped,
}

type Reply = Result<Value, QueueError>;

struct Submission {
    id: QueueJobId,
    action: Interaction,
    reply: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct Ledger {
    next_seq: u64,
    jobs: IndexMap<QueueJobId, QueueJob>,
}

type SharedLedger = Arc<Mutex<Ledger>>;

pub struct InteractionQueue {
    tx: mpsc::UnboundedSender<Submission>,
    ledger: SharedLedger,
    now: Box<dyn Fn() -> u64 + Send + Sync>,
    concurrency: usize,
}

impl InteractionQueue {
    /// Start the queue's dispatcher. Must be called inside a tokio runtime.
    pub fn new(session: impl AutomationSession, concurrency: usize, clock: impl Clock) -> Self {
        let concurrency = concurrency.max(1);
        if concurrency > DEFAULT_CONCURRENCY {
            tracing::warn!(
                concurrency,
                "interaction queue concurrency above 1 shares one automation session between jobs"
            );
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let ledger = SharedLedger::default();
        tokio::spawn(dispatch(
            Arc::new(session),
            rx,
            Arc::clone(&ledger),
            Arc::new(Semaphore::new(concurrency)),
        ));
        Self { tx, ledger, now: Box::new(move || clock.epoch_ms()), concurrency }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Queue `action` and return a ticket for its result.
    pub fn submit(&self, action: Interaction) -> Result<QueueTicket, QueueError> {
        let (reply, rx) = oneshot::channel();
        let mut ledger = self.ledger.lock();
        let seq = ledger.next_seq;
        let job = QueueJob::new(seq, action.clone(), (self.now)());
        let id = job.id.clone();

        // Sent under the lock so channel order matches `seq`
        self.tx.send(Submission { id: id.clone(), action, reply }).map_err(|_| QueueError::Closed)?;
        tracing::info!(job = %id, seq, action = job.action.kind(), status = %job.status, "queue job");
        ledger.next_seq += 1;
        ledger.jobs.insert(id.clone(), job);
        drop(ledger);

        Ok(QueueTicket { id, rx, ledger: Arc::clone(&self.ledger) })
    }

    /// Queue `action` and wait for its turn and result.
    pub async fn enqueue(&self, action: Interaction) -> Result<Value, QueueError> {
        self.submit(action)?.result().await
    }

    /// Records not yet retrieved by their submitters, in arrival order.
    pub fn jobs(&self) -> Vec<QueueJob> {
        self.ledger.lock().jobs.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<QueueJob> {
        self.ledger.lock().jobs.get(id).cloned()
    }
}

/// Handle to one submitted job.
pub struct QueueTicket {
    id: QueueJobId,
    rx: oneshot::Receiver<Reply>,
    ledger: SharedLedger,
}

impl QueueTicket {
    pub fn id(&self) -> &QueueJobId {
        &self.id
    }

    /// Wait for the job to finish. The job's record is discarded afterwards.
    pub async fn result(mut self) -> Result<Value, QueueError> {
        (&mut self.rx).await.unwrap_or(Err(QueueError::Dropped))
    }
}

impl Drop for QueueTicket {
    fn drop(&mut self) {
        let mut ledger = self.ledger.lock();
        if ledger.jobs.get(&self.id).is_some_and(|job| job.status.is_terminal()) {
            ledger.jobs.shift_remove(&self.id);
        }
    }
}

async fn dispatch(
    session: Arc<dyn AutomationSession>,
    mut rx: mpsc::UnboundedReceiver<Submission>,
    ledger: SharedLedger,
    permits: Arc<Semaphore>,
) {
    while let Some(submission) = rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let session = Arc::clone(&session);
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            execute(session.as_ref(), &ledger, submission).await;
            drop(permit);
        });
    }
    tracing::debug!("interaction queue dispatcher stopped");
}

async fn execute(session: &dyn AutomationSession, ledger: &SharedLedger, submission: Submission) {
    let Submission { id, action, reply } = submission;
    transition(ledger, &id, QueueJobStatus::Running, None);

    let result = session.perform(&action).await.map_err(|e| QueueError::Action(e.to_string()));
    match &result {
        Ok(value) => transition(ledger, &id, QueueJobStatus::Done, Some(Ok(value))),
        Err(e) => transition(ledger, &id, QueueJobStatus::Error, Some(Err(e))),
    }

    if reply.send(result).is_err() {
        tracing::debug!(job = %id, "submitter gone, discarding queue job record");
        ledger.lock().jobs.shift_remove(&id);
    }
}

fn transition(
    ledger: &SharedLedger,
    id: &QueueJobId,
    status: QueueJobStatus,
    outcome: Option<Result<&Value, &QueueError>>,
) {
    let mut ledger = ledger.lock();
    let Some(job) = ledger.jobs.get_mut(id) else {
        return;
    };
    if !job.advance(status) {
        return;
    }
    match outcome {
        Some(Ok(value)) => job.result = Some(value.clone()),
        Some(Err(e)) => job.error = Some(e.to_string()),
        None => {}
    }
    match &job.error {
        Some(error) => {
            tracing::info!(job = %id, seq = job.seq, action = job.action.kind(), %status, error = %error, "queue job")
        }
        None => tracing::info!(job = %id, seq = job.seq, action = job.action.kind(), %status, "queue job"),
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
