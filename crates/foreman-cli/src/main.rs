use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use foreman_core::Document;
use foreman_registry::ConverterRegistry;
use foreman_scheduler::Scheduler;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "foreman", about = "Declarative job scheduler", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a task definition and run the schedule until interrupted.
    Run {
        /// Path to the TOML task definition.
        config_file: PathBuf,
    },
    /// Execute every enabled task once, then exit.
    Test {
        /// Path to the TOML task definition.
        config_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foreman=info".into()),
        )
        .init();

    info!("foreman v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Run { config_file } => {
            let scheduler = load(&config_file);

            // Ctrl-C flips the shutdown watch; the loop exits at its next
            // suspension point.
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(true);
                }
            });

            scheduler.run(shutdown_rx).await;
        }
        Command::Test { config_file } => {
            let mut scheduler = load(&config_file);
            scheduler.run_once().await;
        }
    }

    Ok(())
}

/// Resolve the definition into a scheduler, or exit: a schedule that fails
/// to load must never start half-built.
fn load(config_file: &Path) -> Scheduler {
    let result = Document::load(config_file).and_then(|document| {
        Scheduler::load(
            document,
            foreman_slaves::builtin_extensions(),
            ConverterRegistry::new(),
        )
    });

    match result {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("couldn't start foreman: {e}");
            error!("hint: {}", e.hint());
            std::process::exit(1);
        }
    }
}
