//
//  vend-client
//  config/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration Module
//!
//! Loads and saves the `vend` configuration as TOML in the platform config
//! directory. Tokens are not stored here; they live in the keyring (see
//! [`KeyringStore`](crate::auth::KeyringStore)).
//!
//! ## Configuration File Location
//!
//! - **Linux**: `~/.config/vend/config.toml`
//! - **macOS**: `~/Library/Application Support/vend/config.toml`
//! - **Windows**: `C:\Users\<User>\AppData\Roaming\vend\config.toml`
//!
//! ## Example Configuration File
//!
//! ```toml
//! [connection]
//! domain_prefix = "mystore"
//! token_service_url = "https://{DOMAIN_PREFIX}.vendhq.com/api/1.0/token"
//! client_id = "my-client-id"
//! client_secret = "my-client-secret"
//!
//! [retry]
//! max_retries = 3
//! backoff_step_ms = 1000
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vend_client::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set("connection.domain_prefix", "mystore")?;
//! config.save()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::api::retry::{RetryPolicy, DEFAULT_MAX_RETRIES};
use crate::auth::ConnectionInfo;

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const KEYS: &[&str] = &[
    "connection.domain_prefix",
    "connection.token_service_url",
    "connection.client_id",
    "connection.client_secret",
    "connection.api_base",
    "retry.max_retries",
    "retry.backoff_step_ms",
];

/// Global configuration of the `vend` CLI.
///
/// All sections use `#[serde(default)]` so that a partial file loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// The store to talk to and the OAuth client used to refresh tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub domain_prefix: Option<String>,

    /// Token endpoint; `{DOMAIN_PREFIX}` is substituted.
    #[serde(default)]
    pub token_service_url: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    /// Overrides `https://{domain_prefix}.vendhq.com`.
    #[serde(default)]
    pub api_base: Option<String>,
}

impl ConnectionConfig {
    /// Builds the session state for `domain_prefix` with the given tokens.
    pub fn connection_info(
        &self,
        domain_prefix: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> ConnectionInfo {
        ConnectionInfo {
            domain_prefix: domain_prefix.to_string(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(String::from),
            token_service_url: self.token_service_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

/// Retry ceiling and connection backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_backoff_step_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.backoff_step_ms))
    }
}

impl Config {
    /// Loads the configuration from the default path.
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Saves the configuration to the default path, creating its directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", crate::APP_NAME)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Reads a dotted key such as `connection.domain_prefix`.
    ///
    /// Returns `None` for unknown keys and unset values.
    pub fn get(&self, key: &str) -> Option<String> {
        let c = &self.connection;
        match key {
            "connection.domain_prefix" => c.domain_prefix.clone(),
            "connection.token_service_url" => c.token_service_url.clone(),
            "connection.client_id" => c.client_id.clone(),
            "connection.client_secret" => c.client_secret.clone(),
            "connection.api_base" => c.api_base.clone(),
            "retry.max_retries" => Some(self.retry.max_retries.to_string()),
            "retry.backoff_step_ms" => Some(self.retry.backoff_step_ms.to_string()),
            _ => None,
        }
    }

    /// Writes a dotted key. An empty value clears an optional setting.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = || (!value.is_empty()).then(|| value.to_string());
        let c = &mut self.connection;
        match key {
            "connection.domain_prefix" => c.domain_prefix = optional(),
            "connection.token_service_url" => c.token_service_url = optional(),
            "connection.client_id" => c.client_id = optional(),
            "connection.client_secret" => c.client_secret = optional(),
            "connection.api_base" => c.api_base = optional(),
            "retry.max_retries" => {
                self.retry.max_retries = value
                    .parse()
                    .with_context(|| format!("'{}' is not a valid retry count", value))?
            }
            "retry.backoff_step_ms" => {
                self.retry.backoff_step_ms = value
                    .parse()
                    .with_context(|| format!("'{}' is not a valid number of milliseconds", value))?
            }
            _ => bail!("Unknown config key '{}'. Valid keys: {}", key, KEYS.join(", ")),
        }
        Ok(())
    }
}
