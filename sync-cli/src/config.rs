//! Configuration management for the vaultsync CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CLI configuration stored in the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Auth token from the last signin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// API base URL override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl CliConfig {
    /// Load the configuration, or defaults if none exists yet.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("config.json");
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).context("Invalid configuration file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).context("Failed to read configuration"),
        }
    }

    /// Save the configuration. The file holds the auth token, so it is
    /// readable by the owner only.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join("config.json");
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save configuration")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// The stored auth token, or an error telling the user to sign in.
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .context("Not signed in. Run 'vaultsync login' first.")
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
