//! `vaultsync vaults` - list the account's vaults.

use anyhow::Result;
use std::path::Path;

use crate::config::CliConfig;
use sync_client::AccountApi;

/// List the vaults available to the signed-in account.
pub async fn run(data_dir: &Path, api_base: &str) -> Result<()> {
    let config = CliConfig::load(data_dir).await?;
    let token = config.require_token()?;

    let api = AccountApi::with_base(api_base);
    let vaults = api.list_vaults(token).await?;

    if vaults.is_empty() {
        println!("No vaults.");
        return Ok(());
    }
    println!("{:<26} {:<24} HOST", "ID", "NAME");
    for vault in vaults {
        println!("{:<26} {:<24} {}", vault.id, vault.name, vault.host);
    }
    Ok(())
}
