//! # vaultsync
//!
//! Command-line client for vaultsync end-to-end encrypted vaults.
//!
//! ## Commands
//!
//! - `login`: Sign in and store the auth token
//! - `vaults`: List the account's vaults
//! - `sync`: Synchronize a vault into a local directory
//!
//! ## Example
//!
//! ```bash
//! # Sign in once; the token is cached locally
//! vaultsync login
//!
//! # Find the vault id
//! vaultsync vaults
//!
//! # One-shot sync
//! vaultsync sync --vault-id abc123 ~/notes
//!
//! # Keep running and mirror remote changes as they happen
//! vaultsync sync --vault-id abc123 ~/notes --daemon
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{login, sync, vaults};
use sync_client::api::DEFAULT_API_BASE;

/// Command-line client for vaultsync encrypted vaults.
#[derive(Parser, Debug)]
#[command(name = "vaultsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the cached auth token
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Account API base URL
    #[arg(long, global = true, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the auth token
    Login {
        /// Account email (prompted for if omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// List the account's vaults
    Vaults,

    /// Synchronize a vault into a local directory
    Sync {
        /// Id of the vault to sync (see 'vaultsync vaults')
        #[arg(long)]
        vault_id: String,

        /// Local directory to sync into
        dir: PathBuf,

        /// Vault password (prompted for if omitted)
        #[arg(long)]
        password: Option<String>,

        /// Keep watching for remote changes after the first pass
        #[arg(long)]
        daemon: bool,

        /// Print every wire frame
        #[arg(long)]
        show_frames: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    match cli.command {
        Commands::Login { email } => {
            login::run(&data_dir, &cli.api_base, email).await?;
        }
        Commands::Vaults => {
            vaults::run(&data_dir, &cli.api_base).await?;
        }
        Commands::Sync {
            vault_id,
            dir,
            password,
            daemon,
            show_frames,
        } => {
            sync::run(
                &data_dir,
                &cli.api_base,
                sync::SyncArgs {
                    vault_id,
                    dir,
                    password,
                    daemon,
                    show_frames,
                },
            )
            .await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for vaultsync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "vaultsync", "vaultsync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
