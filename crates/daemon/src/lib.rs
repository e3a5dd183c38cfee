// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hv-daemon: the `hvd` binary's HTTP API, successor worker, and operator commands

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod env;
pub mod logging;
pub mod worker;

pub use config::{Config, ConfigError, Settings};
pub use worker::WorkerExit;

#[cfg(test)]
mod test_helpers;
