// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use crate::config::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7878";
pub const DEFAULT_SIDECAR_URL: &str = "http://127.0.0.1:3000";

/// Resolve state directory: HV_STATE_DIR > XDG_STATE_HOME/harvest > ~/.local/state/harvest
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("HV_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("harvest"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/harvest"))
}

/// HTTP listen address for `hvd serve`.
pub fn listen_addr() -> Result<SocketAddr, ConfigError> {
    let raw = std::env::var("HV_LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
    raw.parse().map_err(|_| ConfigError::InvalidEnv { var: "HV_LISTEN_ADDR", value: raw })
}

/// Base URL of the browser-automation sidecar.
pub fn sidecar_url() -> String {
    std::env::var("HV_SIDECAR_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SIDECAR_URL.to_string())
}

pub fn sidecar_token() -> Option<String> {
    std::env::var("HV_SIDECAR_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Binary launched for successor workers. Defaults to the running executable.
pub fn worker_binary() -> std::io::Result<PathBuf> {
    match std::env::var("HV_WORKER_BINARY") {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => std::env::current_exe(),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
