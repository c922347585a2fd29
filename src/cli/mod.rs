//
//  vend-client
//  cli/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # CLI Module
//!
//! Command-line interface of the `vend` binary, built with clap's derive API.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `api` | Authenticated request to any API path |
//! | `auth` | Login, logout, status and token refresh |
//! | `config` | Read and write `config.toml` |
//! | `version` | Print the version |
//!
//! ## Global Options
//!
//! | Flag | Environment | Description |
//! |------|-------------|-------------|
//! | `--domain-prefix`, `-d` | `VEND_DOMAIN_PREFIX` | Store to talk to |
//! | `--access-token` | `VEND_ACCESS_TOKEN` | Use this token instead of the keyring |
//! | `--refresh-token` | `VEND_REFRESH_TOKEN` | Refresh token paired with `--access-token` |
//! | `--api-base` | `VEND_API_BASE` | Override `https://{prefix}.vendhq.com` |

mod api;
mod auth;
mod config;

pub use api::ApiCommand;
pub use auth::AuthCommand;
pub use config::ConfigCommand;

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::api::{ApiError, ErrorKind, VendClient};
use crate::auth::{Connection, KeyringStore};
use crate::config::Config;
use crate::exit_codes;

/// Root command of the `vend` CLI.
#[derive(Parser, Debug)]
#[command(
    name = "vend",
    version,
    about = "Work with a Vend store's API from the command line",
    propagate_version = true,
    after_help = "Use 'vend <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOptions,
}

/// Options shared by every subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Store domain prefix, e.g. "mystore" for mystore.vendhq.com
    #[arg(long, short = 'd', global = true, env = "VEND_DOMAIN_PREFIX")]
    pub domain_prefix: Option<String>,

    /// Access token; bypasses the keyring
    #[arg(long, global = true, env = "VEND_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Refresh token paired with --access-token
    #[arg(long, global = true, env = "VEND_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// API base URL override
    #[arg(long, global = true, env = "VEND_API_BASE")]
    pub api_base: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Api(ApiCommand),

    #[command(visible_alias = "login")]
    Auth(AuthCommand),

    Config(ConfigCommand),

    /// Print the version
    Version,
}

/// The store to use: `--domain-prefix`, then `connection.domain_prefix`.
pub(crate) fn resolve_domain_prefix(global: &GlobalOptions, config: &Config) -> Result<String> {
    global
        .domain_prefix
        .clone()
        .or_else(|| config.connection.domain_prefix.clone())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No store configured. Pass --domain-prefix or run \
                 'vend config set connection.domain_prefix <store>'."
            )
        })
}

/// Builds a client for the configured store.
///
/// Tokens come from the global options when given, otherwise from the
/// keyring; in the keyring case refreshed tokens are written back.
pub(crate) fn open_client(global: &GlobalOptions) -> Result<VendClient> {
    let config = Config::load()?;
    let domain_prefix = resolve_domain_prefix(global, &config)?;

    let (access_token, refresh_token, keyring) = match &global.access_token {
        Some(token) => (Some(token.clone()), global.refresh_token.clone(), None),
        None => {
            let keyring = KeyringStore::new();
            let (access, refresh) = keyring.load_tokens(&domain_prefix)?;
            (access, refresh, Some(keyring))
        }
    };
    let Some(access_token) = access_token else {
        bail!(
            "Not logged in to {}. Run 'vend auth login' or set VEND_ACCESS_TOKEN.",
            domain_prefix
        );
    };

    let mut info = config
        .connection
        .connection_info(&domain_prefix, &access_token, refresh_token.as_deref());
    if let Some(api_base) = &global.api_base {
        info.api_base = Some(api_base.clone());
    }
    debug!(connection = ?info, "opening client");

    let mut connection = Connection::new(info);
    if let Some(keyring) = keyring {
        connection = connection.with_listener(Arc::new(keyring));
    }

    Ok(VendClient::new(connection)?.with_retry_policy(config.retry.policy()))
}

/// Maps a command failure to the process exit code.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    let Some(api_error) = error.downcast_ref::<ApiError>() else {
        return exit_codes::ERROR;
    };
    match api_error {
        ApiError::MissingArguments(_) | ApiError::RefreshFailed(_) => exit_codes::AUTH_ERROR,
        ApiError::Client { status: 404, .. } => exit_codes::NOT_FOUND,
        ApiError::Client { status: 403, .. } => exit_codes::AUTH_ERROR,
        other => match other.kind() {
            Some(ErrorKind::AuthExpired) => exit_codes::AUTH_ERROR,
            Some(ErrorKind::RateLimited) => exit_codes::RATE_LIMIT,
            _ => exit_codes::ERROR,
        },
    }
}
