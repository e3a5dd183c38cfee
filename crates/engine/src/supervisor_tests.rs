// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::RecordingLauncher;
use hv_storage::FileCheckpointStore;
use tempfile::TempDir;

fn supervisor(dir: &TempDir, max_handoffs: u32) -> (Arc<FileCheckpointStore>, Arc<RecordingLauncher>, WorkerSupervisor) {
    let store = Arc::new(FileCheckpointStore::new(dir.path()));
    let launcher = Arc::new(RecordingLauncher::new());
    let supervisor = WorkerSupervisor::new(store.clone(), launcher.clone(), max_handoffs);
    (store, launcher, supervisor)
}

#[test]
fn handoff_saves_escalated_state_then_launches_with_its_ref() {
    let dir = TempDir::new().unwrap();
    let (store, launcher, supervisor) = supervisor(&dir, DEFAULT_MAX_HANDOFFS);
    let mut state = JobState::builder().resume_index(17).build();

    let checkpoint = supervisor
        .checkpoint_and_handoff(&mut state, Escalation::enumeration(44, "3 empty pages"))
        .unwrap();

    assert_eq!(launcher.launched(), vec![checkpoint.clone()]);
    assert_eq!(state.heal_phase, HealPhase::Enumeration);
    assert_eq!(state.resume_index, 44);
    assert_eq!(state.recursion_count, 1);
    assert_eq!(state.heal_reason.as_deref(), Some("3 empty pages"));
    assert_eq!(store.load(&checkpoint).unwrap(), state);
}

#[test]
fn item_analysis_escalation_points_at_remainder_from_zero() {
    let dir = TempDir::new().unwrap();
    let (store, _launcher, supervisor) = supervisor(&dir, DEFAULT_MAX_HANDOFFS);
    let mut state = JobState::builder().resume_index(9).build();
    let remainder = ListRef::new("lst-test-remainder");

    let checkpoint = supervisor
        .checkpoint_and_handoff(&mut state, Escalation::item_analysis(remainder.clone(), "retries exhausted"))
        .unwrap();

    let loaded = store.load(&checkpoint).unwrap();
    assert_eq!(loaded.heal_phase, HealPhase::ItemAnalysis);
    assert_eq!(loaded.resume_index, 0);
    assert_eq!(loaded.partial_list_ref, Some(remainder));
}

#[test]
fn save_failure_never_launches() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let launcher = Arc::new(RecordingLauncher::new());
    let supervisor = WorkerSupervisor::new(
        Arc::new(FileCheckpointStore::new(&blocker)),
        launcher.clone(),
        DEFAULT_MAX_HANDOFFS,
    );
    let mut state = JobState::builder().build();

    let err = supervisor
        .checkpoint_and_handoff(&mut state, Escalation::enumeration(1, "empty"))
        .unwrap_err();

    assert!(matches!(err, SupervisorError::Checkpoint(_)));
    assert!(launcher.launched().is_empty());
}

#[yare::parameterized(
    at_limit = { 9, true },
    past_limit = { 10, false },
)]
fn handoff_limit(prior_handoffs: u32, launches: bool) {
    let dir = TempDir::new().unwrap();
    let (store, launcher, supervisor) = supervisor(&dir, 10);
    let mut state = JobState::builder().recursion_count(prior_handoffs).build();

    let result = supervisor.checkpoint_and_handoff(&mut state, Escalation::enumeration(3, "empty"));

    assert_eq!(result.is_ok(), launches);
    assert_eq!(launcher.launched().len(), usize::from(launches));
    if !launches {
        assert!(matches!(result, Err(SupervisorError::HandoffLimit { count: 11, max: 10 })));
    }
    // Written either way
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn launch_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let supervisor = WorkerSupervisor::new(
        Arc::new(FileCheckpointStore::new(dir.path())),
        Arc::new(RecordingLauncher::failing()),
        DEFAULT_MAX_HANDOFFS,
    );
    let mut state = JobState::builder().build();

    let err = supervisor
        .checkpoint_and_handoff(&mut state, Escalation::enumeration(1, "empty"))
        .unwrap_err();
    assert!(matches!(err, SupervisorError::Launch(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn process_launcher_does_not_wait_for_child() {
    let launcher = ProcessLauncher::new("/bin/sh");
    let started = std::time::Instant::now();

    // `sh worker --checkpoint ...` fails fast, but launch must not observe it
    launcher.launch(&CheckpointRef::new("ckpt-test")).unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[cfg(unix)]
#[tokio::test]
async fn process_launcher_reports_missing_binary() {
    let launcher = ProcessLauncher::new("/nonexistent/hvd");
    assert!(launcher.launch(&CheckpointRef::new("ckpt-test")).is_err());
}
