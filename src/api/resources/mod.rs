//
//  vend-client
//  api/resources/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Resource Collaborators
//!
//! Each function here declares the arguments of one API operation, builds its
//! request and hands both to [`VendClient::dispatch`](crate::api::VendClient::dispatch).
//! Multi-page reads go through [`paginate`](crate::api::common::paginate);
//! per-element reads over a collection go through
//! [`run_serially`](crate::api::run_serially).
//!
//! | Module | Operations |
//! |--------|------------|
//! | [`products`] | fetch by id, list (2.0), fetch all, create |
//! | [`consignments`] | fetch all, products of one consignment, products of many |

pub mod consignments;
pub mod products;

use serde::Deserialize;
use serde_json::json;

use super::args::{CallArgs, CallArgument};
use super::common::{AFTER_ARG, PAGE_ARG, PAGE_SIZE_ARG};

/// `{"data": ...}` envelope of 2.0 single-record responses.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Legacy offset arguments: `page` starting at 1 and an optional `page_size`.
pub(crate) fn offset_args(page_size: Option<i64>) -> CallArgs {
    let mut size = CallArgument::optional(PAGE_SIZE_ARG)
        .wire_key("page_size")
        .description("Records per page");
    if let Some(page_size) = page_size {
        size = size.value(json!(page_size));
    }
    CallArgs::new()
        .with(
            CallArgument::optional(PAGE_ARG)
                .value(json!(1))
                .description("Page to fetch, starting at 1"),
        )
        .with(size)
}

/// 2.0 version-cursor arguments: optional `after` and `page_size`.
///
/// The page number starts undefined; the pagination engine sets one while it runs
/// and 2.0 endpoints ignore it.
pub(crate) fn version_args(after: Option<i64>, page_size: Option<i64>) -> CallArgs {
    let mut args = offset_args(page_size);
    args.unset(PAGE_ARG);

    let mut cursor = CallArgument::optional(AFTER_ARG)
        .description("Return records with a version greater than this");
    if let Some(after) = after {
        cursor = cursor.value(json!(after));
    }
    args.with(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_args_start_at_page_one() {
        let args = offset_args(Some(50));
        let mut pairs = args.query_pairs();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "1".to_string()),
                ("page_size".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_version_args_omit_page() {
        let args = version_args(Some(120), None);
        assert_eq!(args.query_pairs(), vec![("after".to_string(), "120".to_string())]);
    }
}
