// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{FakeSession, SessionEvent};
use hv_core::FakeClock;
use std::time::Duration;

fn post(content: &str) -> Interaction {
    Interaction::CreatePost { content: content.to_string() }
}

fn queue(session: &FakeSession, concurrency: usize) -> InteractionQueue {
    InteractionQueue::new(session.clone(), concurrency, FakeClock::new())
}

#[tokio::test(start_paused = true)]
async fn jobs_run_one_at_a_time_in_submission_order() {
    let session = FakeSession::new(Duration::from_millis(200));
    let queue = queue(&session, DEFAULT_CONCURRENCY);

    let j1 = queue.submit(post("j1")).unwrap();
    let j2 = queue.submit(post("j2")).unwrap();
    let j3 = queue.submit(post("j3")).unwrap();
    let (r3, r1, r2) = tokio::join!(j3.result(), j1.result(), j2.result());
    assert!(r1.is_ok() && r2.is_ok() && r3.is_ok());

    let expected: Vec<SessionEvent> = ["j1", "j2", "j3"]
        .into_iter()
        .flat_map(|c| [SessionEvent::Started(post(c)), SessionEvent::Finished(post(c))])
        .collect();
    assert_eq!(session.events(), expected);
    assert_eq!(session.max_concurrent(), 1);
}

#[tokio::test]
async fn enqueue_returns_action_result() {
    let session = FakeSession::new(Duration::ZERO);
    let queue = queue(&session, DEFAULT_CONCURRENCY);

    let value = queue
        .enqueue(Interaction::SendMessage { recipient: "ada".into(), message: "hi".into() })
        .await
        .unwrap();

    assert_eq!(value, serde_json::json!({ "performed": "send-message" }));
    assert!(queue.jobs().is_empty());
}

#[tokio::test]
async fn failed_action_reports_error_and_queue_continues() {
    let session = FakeSession::new(Duration::ZERO).failing_on("create-post");
    let queue = queue(&session, DEFAULT_CONCURRENCY);

    let failed = queue.submit(post("nope")).unwrap();
    let next = queue.submit(Interaction::AddConnection { profile: "grace".into(), note: None }).unwrap();

    assert!(matches!(failed.result().await, Err(QueueError::Action(_))));
    assert!(next.result().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn job_records_track_lifecycle_until_retrieved() {
    let session = FakeSession::new(Duration::from_secs(1));
    let queue = queue(&session, DEFAULT_CONCURRENCY);

    let first = queue.submit(post("a")).unwrap();
    let second = queue.submit(post("b")).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let statuses: Vec<_> = queue.jobs().iter().map(|j| (j.seq, j.status)).collect();
    assert_eq!(statuses, vec![(0, QueueJobStatus::Running), (1, QueueJobStatus::Queued)]);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let done = queue.get(first.id()).unwrap();
    assert_eq!(done.status, QueueJobStatus::Done);
    assert_eq!(done.result, Some(serde_json::json!({ "performed": "create-post" })));

    first.result().await.unwrap();
    second.result().await.unwrap();
    assert!(queue.jobs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn abandoned_ticket_does_not_leak_record() {
    let session = FakeSession::new(Duration::from_millis(100));
    let queue = queue(&session, DEFAULT_CONCURRENCY);

    drop(queue.submit(post("fire-and-forget")).unwrap());
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(session.events().len(), 2);
    assert!(queue.jobs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn higher_concurrency_overlaps_jobs() {
    let session = FakeSession::new(Duration::from_millis(200));
    let queue = queue(&session, 2);

    let a = queue.submit(post("a")).unwrap();
    let b = queue.submit(post("b")).unwrap();
    let (ra, rb) = tokio::join!(a.result(), b.result());
    assert!(ra.is_ok() && rb.is_ok());

    assert_eq!(queue.concurrency(), 2);
    assert_eq!(session.max_concurrent(), 2);
}
