// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup.
//!
//! `serve` and operator commands log to stderr. Detached workers have no
//! stdio, so they log to a daily-rotated file under `<state_dir>/logs/`.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "hv=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn init_stderr() {
    let _ = tracing_subscriber::fmt().with_env_filter(filter()).with_writer(std::io::stderr).try_init();
}

/// Log to `<logs_dir>/<prefix>.log.<date>`. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init_file(logs_dir: &Path, prefix: &str) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;
    let appender = tracing_appender::rolling::daily(logs_dir, format!("{prefix}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(guard)
}
