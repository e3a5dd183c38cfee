// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hv_core::test_support::strategies::arb_job_state;
use hv_core::HealPhase;
use proptest::prelude::*;
use tempfile::TempDir;

fn store() -> (TempDir, FileCheckpointStore) {
    let dir = TempDir::new().unwrap();
    let store = FileCheckpointStore::new(dir.path());
    (dir, store)
}

proptest! {
    #[test]
    fn load_returns_exactly_what_was_saved(state in arb_job_state()) {
        let (_dir, store) = store();
        let checkpoint = store.save(&state).unwrap();
        prop_assert_eq!(store.load(&checkpoint).unwrap(), state);
    }
}

#[test]
fn save_names_checkpoint_after_job() {
    let (_dir, store) = store();
    let state = JobState::builder().id("job-abc").recursion_count(2).build();
    let checkpoint = store.save(&state).unwrap();
    assert!(checkpoint.starts_with("ckpt-"));
    assert!(checkpoint.ends_with("-abc-2"));
}

#[test]
fn load_missing_checkpoint_is_not_found() {
    let (_dir, store) = store();
    let err = store.load(&CheckpointRef::new("ckpt-missing")).unwrap_err();
    assert!(matches!(err, CheckpointError::NotFound(_)));
}

#[test]
fn load_corrupt_checkpoint_is_an_error() {
    let (dir, store) = store();
    std::fs::create_dir_all(dir.path().join("checkpoints")).unwrap();
    std::fs::write(dir.path().join("checkpoints/ckpt-bad.json"), b"{ not json").unwrap();
    let err = store.load(&CheckpointRef::new("ckpt-bad")).unwrap_err();
    assert!(matches!(err, CheckpointError::Json(_)));
}

#[test]
fn load_rejects_newer_schema() {
    let (dir, store) = store();
    let state = JobState::builder().build();
    let file = serde_json::json!({ "v": 99, "created_at": Utc::now(), "state": state });
    std::fs::create_dir_all(dir.path().join("checkpoints")).unwrap();
    std::fs::write(dir.path().join("checkpoints/ckpt-future.json"), file.to_string()).unwrap();
    let err = store.load(&CheckpointRef::new("ckpt-future")).unwrap_err();
    assert!(matches!(err, CheckpointError::UnsupportedVersion(99)));
}

#[yare::parameterized(
    parent_dir = { "../escape" },
    nested     = { "a/b" },
    hidden     = { ".hidden" },
    empty      = { "" },
)]
fn unsafe_names_are_rejected(name: &str) {
    let (_dir, store) = store();
    let err = store.load(&CheckpointRef::new(name)).unwrap_err();
    assert!(matches!(err, CheckpointError::InvalidRef(_)));
}

#[test]
fn delete_removes_checkpoint_and_is_idempotent() {
    let (_dir, store) = store();
    let checkpoint = store.save(&JobState::builder().build()).unwrap();
    store.delete(&checkpoint).unwrap();
    assert!(matches!(store.load(&checkpoint), Err(CheckpointError::NotFound(_))));
    store.delete(&checkpoint).unwrap();
}

#[test]
fn list_is_newest_first() {
    let (_dir, store) = store();
    let first = store.save(&JobState::builder().id("job-one").build()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = store.save(&JobState::builder().id("job-two").build()).unwrap();
    assert_eq!(store.list().unwrap(), vec![second, first]);
}

#[test]
fn list_on_fresh_store_is_empty() {
    let (_dir, store) = store();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn lists_round_trip_and_replace() {
    let (_dir, store) = store();
    let list = enumeration_list_ref(&JobId::new("job-xyz"));
    store.save_list(&list, &["a".to_string(), "b".to_string()]).unwrap();
    store.save_list(&list, &["a".to_string(), "b".to_string(), "c".to_string()]).unwrap();
    assert_eq!(store.load_list(&list).unwrap(), vec!["a", "b", "c"]);

    store.delete_list(&list).unwrap();
    assert!(matches!(store.load_list(&list), Err(CheckpointError::ListNotFound(_))));
}

#[test]
fn list_names_are_scoped_to_job() {
    let job = JobId::new("job-xyz");
    assert_eq!(enumeration_list_ref(&job).as_str(), "lst-xyz-enumeration");
    assert!(remainder_list_ref(&job).starts_with("lst-xyz-remainder-"));
}

#[test]
fn checkpoint_is_readable_without_the_store() {
    let (dir, store) = store();
    let state = JobState::builder().heal_phase(HealPhase::Enumeration).resume_index(44).build();
    let checkpoint = store.save(&state).unwrap();

    let raw = std::fs::read_to_string(dir.path().join(format!("checkpoints/{checkpoint}.json")))
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["state"]["heal_phase"], "enumeration");
    assert_eq!(value["state"]["resume_index"], 44);
}
