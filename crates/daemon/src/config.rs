// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: state layout plus optional `config.toml` tunables.

use crate::env::state_dir;
use hv_core::ScorerConfig;
use hv_engine::{GateConfig, OrchestratorConfig, RetryConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_HANDOFFS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory (set HV_STATE_DIR or HOME)")]
    NoStateDir,
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/harvest)
    pub state_dir: PathBuf,
    /// Root of `checkpoints/` and `lists/`
    pub checkpoint_root: PathBuf,
    /// Heal sessions and the auto-approve policy
    pub heal_dir: PathBuf,
    /// JSONL sink for classified contacts
    pub contacts_path: PathBuf,
    /// Worker log files
    pub logs_dir: PathBuf,
    pub config_path: PathBuf,
    pub settings: Settings,
}

impl Config {
    /// Load configuration from the resolved state directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::at(state_dir()?)
    }

    /// Load configuration rooted at `state_dir`. A missing `config.toml`
    /// means all defaults.
    pub fn at(state_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let state_dir = state_dir.into();
        let config_path = state_dir.join("config.toml");
        let settings = Settings::read(&config_path)?;
        Ok(Self {
            checkpoint_root: state_dir.clone(),
            heal_dir: state_dir.join("heal"),
            contacts_path: state_dir.join("contacts.jsonl"),
            logs_dir: state_dir.join("logs"),
            config_path,
            settings,
            state_dir,
        })
    }
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub scoring: ScorerConfig,
    pub retry: RetrySettings,
    pub heal: HealSettings,
    pub enumeration: EnumerationSettings,
    pub queue: QueueSettings,
    pub worker: WorkerSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub cooldown_secs: u64,
    pub max_consecutive: usize,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self { cooldown_secs: retry.cooldown.as_secs(), max_consecutive: retry.max_consecutive }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealSettings {
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
    /// Resolved sessions older than this are deleted
    pub retention_secs: u64,
}

impl Default for HealSettings {
    fn default() -> Self {
        let gate = GateConfig::default();
        Self {
            poll_interval_secs: gate.poll_interval.as_secs(),
            max_wait_secs: gate.max_wait.as_secs(),
            retention_secs: gate.retention.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumerationSettings {
    pub page_start: usize,
    pub page_end: usize,
    pub empty_page_limit: usize,
}

impl Default for EnumerationSettings {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            page_start: defaults.page_start,
            page_end: defaults.page_end,
            empty_page_limit: defaults.empty_page_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueSettings {
    pub concurrency: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerSettings {
    pub max_handoffs: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { max_handoffs: DEFAULT_MAX_HANDOFFS }
    }
}

impl Settings {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            scorer: self.scoring,
            retry: RetryConfig {
                cooldown: Duration::from_secs(self.retry.cooldown_secs),
                max_consecutive: self.retry.max_consecutive,
            },
            page_start: self.enumeration.page_start,
            page_end: self.enumeration.page_end,
            empty_page_limit: self.enumeration.empty_page_limit,
        }
    }

    pub fn gate(&self) -> GateConfig {
        GateConfig {
            poll_interval: Duration::from_secs(self.heal.poll_interval_secs.max(1)),
            max_wait: Duration::from_secs(self.heal.max_wait_secs),
            retention: Duration::from_secs(self.heal.retention_secs),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
