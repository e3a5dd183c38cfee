// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon unit tests.

use crate::app::{Collaborators, Engine};
use crate::config::Config;
use hv_core::{CheckpointRef, HealPhase, JobState};
use hv_engine::test_support::{FakePlatform, MemoryEdgeWriter, RecordingLauncher};
use hv_storage::{CheckpointStore, FileCheckpointStore, HealStore};
use std::sync::Arc;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
    pub platform: Arc<FakePlatform>,
    pub edges: Arc<MemoryEdgeWriter>,
    pub launcher: Arc<RecordingLauncher>,
}

impl Fixture {
    /// State dir in a temp directory, enumeration capped at page 5.
    pub fn new(platform: FakePlatform) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::at(dir.path()).unwrap();
        config.settings.enumeration.page_end = 5;
        Self {
            dir,
            config,
            platform: Arc::new(platform),
            edges: Arc::new(MemoryEdgeWriter::new()),
            launcher: Arc::new(RecordingLauncher::new()),
        }
    }

    pub fn engine(&self) -> Engine {
        Engine::new(
            &self.config,
            Collaborators {
                platform: self.platform.clone(),
                edges: self.edges.clone(),
                launcher: self.launcher.clone(),
            },
        )
    }

    pub fn store(&self) -> FileCheckpointStore {
        FileCheckpointStore::new(&self.config.checkpoint_root)
    }

    pub fn heal_store(&self) -> HealStore {
        HealStore::new(&self.config.heal_dir)
    }

    /// Save a job that a previous worker handed off mid-enumeration.
    pub fn handed_off_job(&self) -> CheckpointRef {
        let state = JobState::builder()
            .heal_phase(HealPhase::Enumeration)
            .heal_reason(Some("3 consecutive empty pages".to_string()))
            .resume_index(1)
            .recursion_count(1)
            .build();
        self.store().save(&state).unwrap()
    }
}
