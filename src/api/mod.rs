//
//  vend-client
//  api/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # API Client Layer
//!
//! This module turns validated call descriptors into authenticated requests
//! against a store's Vend API and recovers from connection failures, rate
//! limiting and expired access tokens.
//!
//! ## Architecture
//!
//! - [`args`]: argument declarations and validation
//! - [`request`]: plain-data request descriptors
//! - [`common`]: error type, failure classification and the pagination engine
//! - [`retry`]: one retry strategy per retryable failure kind
//! - [`client`]: the dispatcher, [`VendClient`]
//! - [`serial`]: the serial chain combinator
//! - [`resources`]: products and consignments built on the above
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vend_client::api::{resources::products, VendClient};
//! use vend_client::auth::{Connection, ConnectionInfo};
//!
//! # async fn example() -> Result<(), vend_client::api::ApiError> {
//! let connection = Connection::new(
//!     ConnectionInfo::new("mystore", "access-token")
//!         .with_refresh_token("refresh-token")
//!         .with_token_service(
//!             "https://{DOMAIN_PREFIX}.vendhq.com/api/1.0/token",
//!             "client-id",
//!             "client-secret",
//!         ),
//! );
//! let client = VendClient::new(connection)?;
//!
//! let mut args = products::list_args(None, Some(200));
//! let all = products::fetch_all_products(&client, &mut args).await?;
//! println!("{} products, resume after {:?}", all.len(), args.value_i64("after"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`ApiError`]. Retryable failures only surface once
//! their ceiling is reached, as [`ApiError::RetryExhausted`].

pub mod args;
pub mod client;
pub mod common;
pub mod request;
pub mod resources;
pub mod retry;
pub mod serial;

pub use args::{CallArgs, CallArgument};
pub use client::VendClient;
pub use common::{ApiError, ErrorKind};
pub use request::RequestSpec;
pub use retry::RetryPolicy;
pub use serial::run_serially;
