//! Configuration and identity storage

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::models::Participant;

/// Default cadence for live views when the config does not set one.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Application configuration
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Who we are, as the account system knows us (set by `login`)
    pub identity: Option<IdentityConfig>,
    /// Document store credentials
    pub firestore: Option<FirestoreConfig>,
    /// Push provider credentials (optional; dispatch is skipped without it)
    pub onesignal: Option<OneSignalConfig>,
    /// Media channel application credentials
    pub rtc: Option<RtcConfig>,
    /// Store poll cadence for live views, in milliseconds
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneSignalConfig {
    pub app_id: String,
    pub rest_api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtcConfig {
    pub app_id: String,
    pub token: Option<String>,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "gomeet", "gomeet-chat")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains API keys)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    /// The logged-in participant, if any.
    pub fn participant(&self) -> Option<Participant> {
        self.identity.as_ref().map(|id| Participant {
            id: id.user_id.clone(),
            display_name: id.display_name.clone(),
        })
    }
}
