//
//  vend-client
//  cli/auth.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! `vend auth`: store, inspect, refresh and remove a store's tokens.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use reqwest::Client;

use crate::auth::{exchange_code, mask_token, KeyringStore};
use crate::config::Config;

use super::{open_client, resolve_domain_prefix, GlobalOptions};

/// Manage authentication
#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Store tokens for a store, from an authorization code or directly
    Login(LoginArgs),

    /// Remove the stored tokens of a store
    Logout,

    /// Show the stored credentials of a store
    Status(StatusArgs),

    /// Exchange the refresh token for a new access token
    Refresh,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Authorization code from the OAuth redirect
    #[arg(long, conflicts_with = "token", requires = "redirect_uri")]
    pub code: Option<String>,

    /// Redirect URI registered for the OAuth client
    #[arg(long)]
    pub redirect_uri: Option<String>,

    /// Access token to store as-is
    #[arg(long)]
    pub token: Option<String>,

    /// Refresh token to store with --token
    #[arg(long, requires = "token")]
    pub refresh: Option<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show the stored tokens, masked
    #[arg(long, short = 't')]
    pub show_token: bool,
}

impl AuthCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        match &self.command {
            AuthSubcommand::Login(args) => login(args, global).await,
            AuthSubcommand::Logout => logout(global),
            AuthSubcommand::Status(args) => status(args, global),
            AuthSubcommand::Refresh => refresh(global).await,
        }
    }
}

async fn login(args: &LoginArgs, global: &GlobalOptions) -> Result<()> {
    let keyring = KeyringStore::new();
    let mut config = Config::load()?;

    let (domain_prefix, access_token, refresh_token) = match (&args.code, &args.token) {
        (Some(code), _) => {
            let connection = &config.connection;
            let (Some(url), Some(client_id), Some(client_secret)) = (
                connection.token_service_url.as_deref(),
                connection.client_id.as_deref(),
                connection.client_secret.as_deref(),
            ) else {
                bail!(
                    "connection.token_service_url, connection.client_id and \
                     connection.client_secret must be configured. Use 'vend config set'."
                );
            };
            let requested_prefix = resolve_domain_prefix(global, &config).unwrap_or_default();
            let redirect_uri = args.redirect_uri.as_deref().unwrap_or_default();

            let tokens = exchange_code(
                &Client::new(),
                url,
                client_id,
                client_secret,
                code,
                redirect_uri,
                &requested_prefix,
            )
            .await
            .context("Failed to exchange authorization code")?;

            let domain_prefix = tokens
                .domain_prefix
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or(requested_prefix);
            if domain_prefix.is_empty() {
                bail!("The token endpoint did not name a store. Pass --domain-prefix.");
            }
            (domain_prefix, tokens.access_token, tokens.refresh_token)
        }
        (None, Some(token)) => (
            resolve_domain_prefix(global, &config)?,
            token.clone(),
            args.refresh.clone(),
        ),
        (None, None) => bail!("Pass --code with --redirect-uri, or --token"),
    };

    keyring.store(&domain_prefix, &access_token)?;
    if let Some(refresh_token) = &refresh_token {
        keyring.store(&KeyringStore::refresh_key(&domain_prefix), refresh_token)?;
    }

    if config.connection.domain_prefix.is_none() {
        config.connection.domain_prefix = Some(domain_prefix.clone());
        config.save()?;
    }

    println!("Logged in to {}", domain_prefix);
    Ok(())
}

fn logout(global: &GlobalOptions) -> Result<()> {
    let config = Config::load()?;
    let domain_prefix = resolve_domain_prefix(global, &config)?;
    KeyringStore::new().clear_tokens(&domain_prefix)?;
    println!("Logged out of {}", domain_prefix);
    Ok(())
}

fn status(args: &StatusArgs, global: &GlobalOptions) -> Result<()> {
    let config = Config::load()?;
    let Ok(domain_prefix) = resolve_domain_prefix(global, &config) else {
        println!("No store configured");
        println!();
        println!("Run 'vend auth login --domain-prefix <store> ...' to authenticate");
        return Ok(());
    };

    let (access, refresh) = match &global.access_token {
        Some(token) => (Some(token.clone()), global.refresh_token.clone()),
        None => KeyringStore::new().load_tokens(&domain_prefix)?,
    };
    let info = config
        .connection
        .connection_info(&domain_prefix, access.as_deref().unwrap_or_default(), refresh.as_deref());

    println!("{}", domain_prefix);
    println!("  API: {}", info.base_url());
    println!(
        "  Access token: {}",
        if access.is_some() { "stored" } else { "missing" }
    );
    println!(
        "  Refresh: {}",
        if info.refresh_credentials().is_some() {
            "available"
        } else {
            "not configured"
        }
    );

    if args.show_token {
        if let Some(token) = &access {
            println!("  Token: {}", mask_token(token));
        }
        if let Some(token) = &refresh {
            println!("  Refresh token: {}", mask_token(token));
        }
    }
    Ok(())
}

async fn refresh(global: &GlobalOptions) -> Result<()> {
    let client = open_client(global)?;
    let connection = client.connection();
    let stale = connection.access_token().await;

    connection.refresh(client.http(), &stale).await?;

    let info = connection.snapshot().await;
    println!("Refreshed access token for {}", info.domain_prefix);
    Ok(())
}
