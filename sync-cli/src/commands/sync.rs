//! `vaultsync sync` - synchronize a vault into a local directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;

use crate::config::CliConfig;
use sync_client::transport::ws::WsTransport;
use sync_client::{
    AccountApi, Direction, FsStore, PassReport, SessionConfig, SyncEngine, VaultSession,
};

/// Arguments for the sync command.
pub struct SyncArgs {
    /// Id of the vault to sync.
    pub vault_id: String,
    /// Local directory to sync into.
    pub dir: PathBuf,
    /// Vault password; prompted for when absent.
    pub password: Option<String>,
    /// Keep watching for remote changes after the first pass.
    pub daemon: bool,
    /// Print every wire frame to stdout.
    pub show_frames: bool,
}

/// Run one sync pass (and optionally keep watching) against a vault.
pub async fn run(data_dir: &Path, api_base: &str, args: SyncArgs) -> Result<()> {
    anyhow::ensure!(
        args.dir.is_dir(),
        "target {} is not a directory",
        args.dir.display()
    );

    let config = CliConfig::load(data_dir).await?;
    let token = config.require_token()?;

    let api = AccountApi::with_base(api_base);
    let vault = api
        .list_vaults(token)
        .await?
        .into_iter()
        .find(|v| v.id == args.vault_id)
        .with_context(|| format!("No vault with id {}", args.vault_id))?;

    let password = match args.password {
        Some(password) => password,
        None if !vault.password.is_empty() => vault.password.clone(),
        None => rpassword::prompt_password(format!("Password for vault '{}': ", vault.name))?,
    };

    println!("Deriving vault key...");
    let session = Arc::new(VaultSession::new(
        &vault,
        &password,
        SessionConfig::new(token),
        WsTransport::new(),
    )?);

    if args.show_frames {
        spawn_frame_printer(&session);
    }

    let keepalive = session.spawn_keepalive();
    let mut engine = SyncEngine::new(Arc::clone(&session), FsStore::new(&args.dir));

    engine.bootstrap().await?;
    if let Some((usage, quota)) = engine.state().usage() {
        println!("Vault '{}': {usage} of {quota} bytes used.", vault.name);
    }

    let report = engine.run_pass().await?;
    print_report(&report);

    if args.daemon {
        println!("Watching for remote changes. Ctrl-C to stop.");
        tokio::select! {
            result = engine.watch() => result?,
            _ = tokio::signal::ctrl_c() => {}
        }
    }

    keepalive.abort();
    session.close().await;
    Ok(())
}

fn print_report(report: &PassReport) {
    println!("Sync pass: {report}.");
    for path in &report.conflicts {
        println!("  conflict (left untouched): {path}");
    }
    for failure in &report.failures {
        println!("  failed: {}: {}", failure.path, failure.error);
    }
}

fn spawn_frame_printer(session: &Arc<VaultSession<WsTransport>>) {
    let mut log = session.frame_log();
    tokio::spawn(async move {
        loop {
            match log.recv().await {
                Ok(entry) => {
                    let arrow = match entry.direction {
                        Direction::Sent => "->",
                        Direction::Received => "<-",
                    };
                    println!("{arrow} {}", entry.summary);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}
