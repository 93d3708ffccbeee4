// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ferry - relay messages from one Telegram chat to another.
//!
//! This is the binary entry point: a headless front end for the relay engine.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod messages;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ferry_config::model::FerryConfig;
use ferry_core::FerryError;
use ferry_relay::Verifier;
use ferry_storage::SqliteStorage;
use ferry_telegram::TelegramClient;

/// Ferry - relay messages from one Telegram chat to another.
#[derive(Parser, Debug)]
#[command(name = "ferry", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify the credential and relay until SIGINT/SIGTERM.
    Serve,
    /// Resolve a credential to its bot name.
    Verify {
        /// Credential to check; defaults to `relay.credential`.
        #[arg(long)]
        credential: Option<String>,
    },
    /// Print the local message log.
    Messages {
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Show only the most recent N records.
        #[arg(long)]
        limit: Option<usize>,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Empty the local message log.
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ferry_config::load_and_validate_path(path),
        None => ferry_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ferry_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.relay.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Verify { credential } => run_verify(&config, credential).await,
        Commands::Messages { json, limit, plain } => {
            messages::run_messages(&config, json, limit, plain).await
        }
        Commands::Clear => run_clear(&config).await,
    };

    if let Err(e) = result {
        eprintln!("ferry: {e}");
        std::process::exit(1);
    }
}

async fn run_verify(config: &FerryConfig, credential: Option<String>) -> Result<(), FerryError> {
    let credential = credential
        .or_else(|| config.relay.credential.clone())
        .ok_or_else(|| {
            FerryError::Config(
                "no credential: pass --credential or set relay.credential".to_string(),
            )
        })?;

    let client = Arc::new(TelegramClient::new(&config.telegram)?);
    let identity = Verifier::new(client).verify(&credential).await?;
    println!("{}", identity.resolved_name);
    Ok(())
}

async fn run_clear(config: &FerryConfig) -> Result<(), FerryError> {
    use ferry_core::{MessageStore, PluginAdapter};

    let storage = SqliteStorage::open(config.storage.clone()).await?;
    storage.clear_all().await?;
    storage.shutdown().await?;
    println!("message log cleared");
    Ok(())
}

/// Initialize the tracing subscriber, logging to stderr.
///
/// `RUST_LOG` overrides `relay.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ferry={log_level},ferry_core={log_level},ferry_config={log_level},\
             ferry_storage={log_level},ferry_telegram={log_level},ferry_relay={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
