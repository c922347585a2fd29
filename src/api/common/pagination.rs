//
//  vend-client
//  api/common/pagination.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Pagination Engine for Vend API Responses
//!
//! Vend exposes two incompatible pagination conventions, and this module folds
//! both into one accumulation loop driven by [`paginate`].
//!
//! # Overview
//!
//! | Cursor | API | Strategy |
//! |--------|-----|----------|
//! | [`PageCursor::Offset`] | legacy `/api/...` | `page` number until `pagination.pages` |
//! | [`PageCursor::Version`] | `/api/2.0/...` | `after` = highest `version.max` seen |
//!
//! The cursor is detected structurally from each response, never from what
//! the caller asked for.
//!
//! # Legacy vs 2.0 Pagination
//!
//! **Legacy** endpoints answer with either a `pagination` block or the same
//! fields at the top level:
//! ```json
//! {"products": [...], "pagination": {"results": 250, "page": 1, "page_size": 100, "pages": 3}}
//! ```
//!
//! **2.0** endpoints answer with a version envelope; the next page starts
//! strictly after `version.max`:
//! ```json
//! {"data": [...], "version": {"min": 1021, "max": 2093}}
//! ```
//!
//! # Example
//!
//! ```rust
//! use serde_json::{json, Value};
//! use vend_client::api::args::CallArgs;
//! use vend_client::api::common::{paginate, page_items};
//! use vend_client::api::ApiError;
//!
//! # tokio_test::block_on(async {
//! let mut args = CallArgs::new();
//! args.set("page", json!(1));
//!
//! let all = paginate(
//!     &mut args,
//!     |page_args| async move {
//!         let page = page_args.value_i64("page").unwrap_or(1);
//!         Ok::<Value, ApiError>(json!({
//!             "products": [{"id": page}],
//!             "pagination": {"page": page, "pages": 2}
//!         }))
//!     },
//!     |response, mut acc: Vec<Value>| {
//!         acc.extend(page_items(&response, "products"));
//!         Ok(acc)
//!     },
//!     Vec::new(),
//! )
//! .await?;
//!
//! assert_eq!(all.len(), 2);
//! # Ok::<(), ApiError>(())
//! # });
//! ```

use std::future::Future;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::ApiError;
use crate::api::args::CallArgs;

/// Argument holding the legacy page number (1-indexed).
pub const PAGE_ARG: &str = "page";

/// Argument holding the requested page size.
pub const PAGE_SIZE_ARG: &str = "pageSize";

/// Argument holding the 2.0 version cursor.
pub const AFTER_ARG: &str = "after";

/// Position of the next page to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    /// Legacy convention: request page `page`.
    Offset {
        /// Next page number
        page: i64,
        /// Page size carried over from the call arguments
        page_size: Option<i64>,
    },
    /// 2.0 convention: request records strictly after version `after`.
    Version {
        /// Highest version seen so far
        after: i64,
        /// Page size carried over from the call arguments
        page_size: Option<i64>,
    },
}

impl PageCursor {
    /// Detects the cursor for the page following `response`.
    ///
    /// Returns `None` when `response` is the last page. The offset rule is
    /// tried first; the version rule only applies when the offset rule does
    /// not.
    pub fn detect(response: &Value, args: &CallArgs) -> Option<Self> {
        let current_page = args.value_i64(PAGE_ARG).unwrap_or(1);
        let page_size = args.value_i64(PAGE_SIZE_ARG);

        if let Some(pages) = response.pointer("/pagination/pages").and_then(lenient_i64) {
            if pages > current_page {
                return Some(Self::Offset {
                    page: current_page + 1,
                    page_size,
                });
            }
        }

        let min = response.pointer("/version/min").and_then(lenient_i64);
        let max = response.pointer("/version/max").and_then(lenient_i64);
        let has_data = response
            .get("data")
            .and_then(Value::as_array)
            .is_some_and(|data| !data.is_empty());

        match (min, max) {
            (Some(_), Some(max)) if has_data => Some(Self::Version {
                after: max,
                page_size,
            }),
            _ => None,
        }
    }

    /// Moves `args` to this cursor.
    ///
    /// In version mode the page number is bumped as well; it is informational
    /// only and has no bearing on which records are returned.
    pub fn advance(&self, args: &mut CallArgs) {
        match *self {
            Self::Offset { page, .. } => args.set(PAGE_ARG, json!(page)),
            Self::Version { after, .. } => {
                args.set(AFTER_ARG, json!(after));
                let page = args.value_i64(PAGE_ARG).unwrap_or(1);
                args.set(PAGE_ARG, json!(page + 1));
            }
        }
    }
}

/// Lifts the top-level legacy pagination fields into a `pagination` block.
///
/// Applies only when the response has no `pagination` block yet and carries
/// both `page` and `pages` at the top level.
pub fn normalize_legacy(response: &mut Value) {
    let Some(object) = response.as_object_mut() else {
        return;
    };
    if object.contains_key("pagination")
        || !object.contains_key("page")
        || !object.contains_key("pages")
    {
        return;
    }

    let field = |key: &str| object.get(key).cloned().unwrap_or(Value::Null);
    let pagination = json!({
        "results": field("results"),
        "page": field("page"),
        "page_size": field("page_size"),
        "pages": field("pages"),
    });
    object.insert("pagination".to_string(), pagination);
}

/// Drives `fetch_page` across every page and folds each one into an
/// accumulator.
///
/// `fetch_page` is called exactly once per page with a snapshot of the
/// current arguments; `fold` is called exactly once per page, in page order,
/// and its output is the only accumulator the next fold sees. On return
/// `args` holds the cursor of the last page fetched, so a 2.0 sync can be
/// resumed from `args.after`.
///
/// # Errors
///
/// The first error from `fetch_page` or `fold` aborts the run; pages already
/// folded are discarded with the accumulator.
pub async fn paginate<A, F, Fut, G>(
    args: &mut CallArgs,
    mut fetch_page: F,
    mut fold: G,
    init: A,
) -> Result<A, ApiError>
where
    F: FnMut(CallArgs) -> Fut,
    Fut: Future<Output = Result<Value, ApiError>>,
    G: FnMut(Value, A) -> Result<A, ApiError>,
{
    let mut accumulator = init;
    let mut fetched: u32 = 0;

    loop {
        let mut response = fetch_page(args.clone()).await?;
        fetched += 1;
        normalize_legacy(&mut response);

        let next = PageCursor::detect(&response, args);
        accumulator = fold(response, accumulator)?;

        let Some(cursor) = next else {
            debug!(pages = fetched, "pagination finished");
            return Ok(accumulator);
        };

        if let PageCursor::Version { after, .. } = cursor {
            if args.value_i64(AFTER_ARG).is_some_and(|current| after <= current) {
                warn!(after, "version cursor did not advance; stopping pagination");
                return Ok(accumulator);
            }
        }

        debug!(page = fetched, ?cursor, "fetching next page");
        cursor.advance(args);
    }
}

/// Items of a page: the array under `key`, or under `data` for 2.0 responses.
pub fn page_items(response: &Value, key: &str) -> Vec<Value> {
    response
        .get(key)
        .or_else(|| response.get("data"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Items of a page whose resource key is not known up front.
///
/// Prefers `data`, then the first top-level array.
pub fn page_items_any(response: &Value) -> Vec<Value> {
    if let Some(data) = response.get("data").and_then(Value::as_array) {
        return data.clone();
    }
    response
        .as_object()
        .and_then(|o| o.values().find_map(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
