//
//  vend-client
//  lib.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Vend Client Library
//!
//! A client for the Vend point-of-sale REST API. It turns validated call
//! descriptors into authenticated requests and recovers from the failure
//! modes of an OAuth 2.0 protected, paginated API.
//!
//! ## Features
//!
//! - **Validated calls**: required arguments are checked before anything is sent
//! - **Retries**: connection failures (linear backoff), rate limits (server
//!   dictated wait) and expired access tokens (refresh, then retry), each with
//!   its own ceiling
//! - **Shared session**: one [`Connection`](auth::Connection) per store, with
//!   refreshed tokens visible to every client and persisted through a listener
//! - **Pagination**: legacy page numbers and 2.0 version cursors behind one
//!   fold-based engine
//! - **Serial chains**: per-element calls over a collection, strictly in order
//!
//! ## Module Structure
//!
//! - [`api`]: dispatcher, retry strategies, pagination, resources
//! - [`auth`]: session state, token endpoint, keyring storage
//! - [`config`]: `config.toml` management
//! - [`cli`]: the `vend` command-line interface
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vend_client::api::{resources::products, VendClient};
//! use vend_client::auth::{Connection, ConnectionInfo};
//!
//! # async fn example() -> Result<(), vend_client::api::ApiError> {
//! let client = VendClient::new(Connection::new(ConnectionInfo::new("mystore", "token")))?;
//! let product = products::fetch_product(&client, &products::fetch_args(Some("abc"))).await?;
//! println!("{:?}", product.name);
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions.
pub mod cli;

/// Request dispatch, retries, pagination and resource collaborators.
pub mod api;

/// Session state, OAuth token endpoint and keyring storage.
pub mod auth;

/// Configuration file management.
///
/// - Linux: `~/.config/vend/config.toml`
/// - macOS: `~/Library/Application Support/vend/config.toml`
/// - Windows: `%APPDATA%\vend\config.toml`
pub mod config;

pub use api::{ApiError, VendClient};
pub use cli::Cli;
pub use config::Config;

/// Name of the CLI binary, also used for the configuration directory.
pub const APP_NAME: &str = "vend";

/// Crate version, from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes for the CLI.
///
/// - `0`: Success
/// - `1-3`: General errors and usage issues
/// - `4-7`: Authentication-related issues
/// - `8-15`: Resource-related issues
/// - `32+`: External service issues
pub mod exit_codes {
    /// The command completed without errors.
    pub const SUCCESS: i32 = 0;

    /// An unspecified error occurred. Check stderr for details.
    pub const ERROR: i32 = 1;

    /// The command was invoked with invalid arguments or options.
    pub const USAGE: i32 = 2;

    /// Not logged in, missing refresh credentials, or the access token could
    /// not be refreshed. Run `vend auth login` to authenticate.
    pub const AUTH_ERROR: i32 = 4;

    /// The requested resource does not exist.
    pub const NOT_FOUND: i32 = 8;

    /// The API kept answering 429 after every retry.
    pub const RATE_LIMIT: i32 = 32;
}
