// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hvd: harvest daemon, successor worker, and operator CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use hv_adapters::SidecarClient;
use hv_core::{CheckpointRef, SystemClock};
use hv_daemon::api::{self, AppState};
use hv_daemon::app::{Collaborators, Engine};
use hv_daemon::commands::{self, HealCommand};
use hv_daemon::{env, logging, worker, Config, WorkerExit};
use hv_engine::InteractionQueue;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "hvd", version, about = "Resilient search job orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// Resume a job from a checkpoint (started by a handoff, not by hand)
    Worker {
        #[arg(long)]
        checkpoint: String,
    },
    /// Inspect and resolve heal sessions
    Heal {
        #[command(subcommand)]
        command: HealCommand,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve => {
            logging::init_stderr();
            runtime()?.block_on(serve())
        }
        Command::Worker { checkpoint } => {
            let exit = run_worker(CheckpointRef::new(checkpoint));
            std::process::exit(exit.code());
        }
        Command::Heal { command } => {
            logging::init_stderr();
            let config = Config::load()?;
            commands::heal(&config, command, &mut std::io::stdout().lock())
        }
    }
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

fn sidecar() -> anyhow::Result<SidecarClient> {
    let url = env::sidecar_url();
    SidecarClient::new(&url, env::sidecar_token().as_deref())
        .with_context(|| format!("failed to create sidecar client for {url}"))
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::load()?;
    let addr = env::listen_addr()?;
    let sidecar = sidecar()?;
    let worker_binary = env::worker_binary().context("failed to locate worker binary")?;

    let collaborators = Collaborators::production(&config, &sidecar, worker_binary);
    let state = Arc::new(AppState {
        engine: Engine::new(&config, collaborators),
        queue: InteractionQueue::new(sidecar.session(), config.settings.queue.concurrency, SystemClock),
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, state_dir = %config.state_dir.display(), sidecar = sidecar.base_url(), "hvd serving");
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}

/// Everything up to loading the checkpoint counts as a failed worker; a
/// checkpoint that cannot be read has its own exit status.
fn run_worker(checkpoint: CheckpointRef) -> WorkerExit {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("hvd worker: {e}");
            return WorkerExit::Failed;
        }
    };
    let _guard = match logging::init_file(&config.logs_dir, "worker") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("hvd worker: failed to open log directory: {e}");
            return WorkerExit::Failed;
        }
    };

    let setup = runtime().map_err(anyhow::Error::from).and_then(|rt| {
        let sidecar = sidecar()?;
        let worker_binary = env::worker_binary()?;
        Ok((rt, Collaborators::production(&config, &sidecar, worker_binary)))
    });
    let (rt, collaborators) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            tracing::error!(%checkpoint, error = %e, "worker setup failed");
            return WorkerExit::Failed;
        }
    };

    // The launcher spawns successors onto the runtime, so build the engine inside it
    rt.block_on(async {
        let engine = Engine::new(&config, collaborators);
        worker::run(&engine, &checkpoint).await
    })
}
