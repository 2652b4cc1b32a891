//! `vaultsync login` - sign in and store the auth token.

use anyhow::Result;
use std::path::Path;

use crate::config::CliConfig;
use sync_client::AccountApi;

/// Sign in with account credentials and persist the token.
pub async fn run(data_dir: &Path, api_base: &str, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => super::prompt_line("Email: ")?,
    };
    let password = rpassword::prompt_password("Account password: ")?;

    let api = AccountApi::with_base(api_base);
    let token = api.signin(&email, &password).await?;

    let mut config = CliConfig::load(data_dir).await?;
    config.token = Some(token);
    config.save(data_dir).await?;

    println!("Signed in as {email}.");
    Ok(())
}
