// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hvd heal ...`: operator controls acting directly on the durable heal store.
//!
//! These work without a running `serve` process; a waiting worker picks up
//! the change on its next poll.

use crate::app;
use crate::config::Config;
use clap::Subcommand;
use hv_core::HealSession;
use hv_storage::{CheckpointStore, FileCheckpointStore};
use std::io::Write;

#[derive(Debug, Subcommand)]
pub enum HealCommand {
    /// Show the pending heal session and stored checkpoints
    Status,
    /// Authorize a pending session so its worker continues
    Authorize {
        session_id: String,
        /// Authorize future sessions for the same operator automatically
        #[arg(long)]
        auto_approve: bool,
    },
    /// Cancel a pending session; its worker exits without resuming
    Cancel { session_id: String },
}

pub fn heal(config: &Config, command: HealCommand, out: &mut impl Write) -> anyhow::Result<()> {
    let gate = app::gate(config);
    match command {
        HealCommand::Status => {
            match gate.status()? {
                Some(session) => write_session(out, &session)?,
                None => writeln!(out, "no pending heal session")?,
            }
            let checkpoints = FileCheckpointStore::new(&config.checkpoint_root).list()?;
            if !checkpoints.is_empty() {
                writeln!(out, "checkpoints (newest first):")?;
                for checkpoint in checkpoints {
                    writeln!(out, "  {checkpoint}")?;
                }
            }
        }
        HealCommand::Authorize { session_id, auto_approve } => {
            let session = gate.authorize(&session_id, auto_approve)?;
            writeln!(out, "authorized {}", session.id)?;
            if auto_approve {
                writeln!(out, "future sessions for {} will be approved automatically", session.operator)?;
            }
        }
        HealCommand::Cancel { session_id } => {
            let session = gate.cancel(&session_id)?;
            writeln!(out, "cancelled {}", session.id)?;
        }
    }
    Ok(())
}

fn write_session(out: &mut impl Write, session: &HealSession) -> std::io::Result<()> {
    writeln!(out, "pending heal session {}", session.id)?;
    writeln!(out, "  job:      {}", session.job_id)?;
    writeln!(out, "  operator: {}", session.operator)?;
    writeln!(out, "  phase:    {}", session.heal_phase)?;
    if let Some(reason) = &session.heal_reason {
        writeln!(out, "  reason:   {reason}")?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
