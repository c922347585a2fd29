//
//  vend-client
//  cli/config.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! `vend config`: read and write `config.toml`.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::{Config, KEYS};

use super::GlobalOptions;

/// Manage configuration
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Print the value of a key
    Get(GetArgs),

    /// Set the value of a key; an empty value clears it
    Set(SetArgs),

    /// Print every key and its value
    #[command(visible_alias = "ls")]
    List,

    /// Print the path of the configuration file
    Path,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Dotted key, e.g. connection.domain_prefix
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Dotted key, e.g. retry.max_retries
    pub key: String,

    pub value: String,
}

impl ConfigCommand {
    pub async fn run(&self, _global: &GlobalOptions) -> Result<()> {
        match &self.command {
            ConfigSubcommand::Get(args) => {
                let config = Config::load()?;
                if let Some(value) = config.get(&args.key) {
                    println!("{}", value);
                }
                Ok(())
            }
            ConfigSubcommand::Set(args) => {
                let mut config = Config::load()?;
                config.set(&args.key, &args.value)?;
                config.save()
            }
            ConfigSubcommand::List => {
                let config = Config::load()?;
                for key in KEYS {
                    let value = match (*key, config.get(key)) {
                        ("connection.client_secret", Some(_)) => "****".to_string(),
                        (_, value) => value.unwrap_or_default(),
                    };
                    println!("{}={}", key, value);
                }
                Ok(())
            }
            ConfigSubcommand::Path => {
                println!("{}", Config::config_path()?.display());
                Ok(())
            }
        }
    }
}
