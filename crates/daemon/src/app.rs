// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root: wires stores, collaborators and engine components.

use crate::config::Config;
use hv_adapters::SidecarClient;
use hv_core::SystemClock;
use hv_engine::{
    EdgeWriter, HealAuthorizationGate, JobOrchestrator, Platform, ProcessLauncher, WorkerLauncher,
    WorkerSupervisor,
};
use hv_storage::{CheckpointStore, ContactLog, FileCheckpointStore, HealStore};
use std::sync::Arc;

/// External collaborators the engine drives.
pub struct Collaborators {
    pub platform: Arc<dyn Platform>,
    pub edges: Arc<dyn EdgeWriter>,
    pub launcher: Arc<dyn WorkerLauncher>,
}

impl Collaborators {
    /// Sidecar-backed platform, JSONL contact log, and a launcher that
    /// re-executes `worker_binary`.
    pub fn production(
        config: &Config,
        sidecar: &SidecarClient,
        worker_binary: std::path::PathBuf,
    ) -> Self {
        Self {
            platform: Arc::new(sidecar.clone()),
            edges: Arc::new(ContactLog::new(&config.contacts_path)),
            launcher: Arc::new(ProcessLauncher::new(worker_binary)),
        }
    }
}

/// Everything a job run needs, shared by `serve` and `worker`.
pub struct Engine {
    pub orchestrator: JobOrchestrator<SystemClock>,
    pub gate: Arc<HealAuthorizationGate<SystemClock>>,
    pub store: Arc<dyn CheckpointStore>,
}

impl Engine {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        let settings = &config.settings;
        let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(&config.checkpoint_root));
        let gate = Arc::new(gate(config));
        let supervisor = WorkerSupervisor::new(
            Arc::clone(&store),
            collaborators.launcher,
            settings.worker.max_handoffs,
        );
        let orchestrator = JobOrchestrator::new(
            collaborators.platform,
            collaborators.edges,
            Arc::clone(&store),
            supervisor,
            Arc::clone(&gate),
            settings.orchestrator(),
            SystemClock,
        );
        Self { orchestrator, gate, store }
    }
}

/// Heal gate over the configured heal directory.
pub fn gate(config: &Config) -> HealAuthorizationGate<SystemClock> {
    HealAuthorizationGate::new(HealStore::new(&config.heal_dir), config.settings.gate(), SystemClock)
}
