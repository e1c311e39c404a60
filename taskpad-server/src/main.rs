//! `taskpad-server`: the task API over an in-memory repository.
//!
//! ```bash
//! cargo run --bin taskpad-server -- --bind 0.0.0.0:9100
//! cargo run --bin taskpad-server -- --seed demo-tasks.json
//! ```
//!
//! Records live only as long as the process; `--seed` prefills them.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use taskpad_server::config::ServerArgs;
use taskpad_server::routes::{self, ServerState};
use taskpad_server::store::TaskRepository;

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let seed = match args.load_seed() {
        Ok(seed) => seed,
        Err(e) => {
            tracing::error!(error = %e, "cannot load seed tasks");
            return ExitCode::FAILURE;
        }
    };
    let seeded: usize = seed.values().map(Vec::len).sum();
    let state = Arc::new(ServerState::with_store(TaskRepository::from_seed(seed)));

    let (addr, server) = match routes::start_server_with_state(&args.bind, state).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(addr = %args.bind, error = %e, "cannot start task server");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(addr = %addr, seeded, "task server listening");

    tokio::select! {
        joined = server => {
            if let Err(e) = joined {
                tracing::error!(error = %e, "task server stopped unexpectedly");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }
    ExitCode::SUCCESS
}
