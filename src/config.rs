//! Configuration Management
//!
//! Handles persistent configuration storage for rfnav.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const URL_ENV: &str = "REDFISH_URL";
pub const USERNAME_ENV: &str = "REDFISH_USERNAME";
pub const PASSWORD_ENV: &str = "REDFISH_PASSWORD";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User configuration. Passwords are never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Last used service, e.g. `https://bmc.example.com`
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Session login (true) or HTTP Basic auth (false)
    #[serde(default = "default_true")]
    pub use_session: bool,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            use_session: true,
            verify_tls: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rfnav").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file; missing or unreadable files give defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective service URL (CLI > env > config)
    pub fn effective_base_url(&self, cli: Option<&str>) -> Option<String> {
        pick(cli, URL_ENV, self.base_url.as_deref())
    }

    /// Get effective username (CLI > env > config)
    pub fn effective_username(&self, cli: Option<&str>) -> Option<String> {
        pick(cli, USERNAME_ENV, self.username.as_deref())
    }

    /// Get effective password (CLI > env); never read from the file
    pub fn effective_password(&self, cli: Option<&str>) -> Option<String> {
        pick(cli, PASSWORD_ENV, None)
    }

    /// Set the target service and save
    pub fn set_base_url(&mut self, base_url: &str, username: Option<&str>) -> Result<()> {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        if let Some(username) = username {
            self.username = Some(username.to_string());
        }
        self.save()
    }
}

fn pick(cli: Option<&str>, env: &str, file: Option<&str>) -> Option<String> {
    cli.map(str::to_string)
        .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()))
        .or_else(|| file.map(str::to_string))
}
