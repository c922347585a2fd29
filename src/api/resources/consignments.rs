//
//  vend-client
//  api/resources/consignments.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Consignments (stock orders, transfers and returns) on the legacy API.
//!
//! Consignment products can only be listed one consignment at a time, so
//! [`fetch_products_for_consignments`] walks the consignment ids serially and
//! paginates each one.

use serde_json::{json, Value};
use tracing::info;

use super::offset_args;
use crate::api::args::{CallArgs, CallArgument};
use crate::api::client::VendClient;
use crate::api::common::{page_items, paginate, ApiError, AFTER_ARG, PAGE_ARG};
use crate::api::serial::run_serially;

const CONSIGNMENT_ID_ARG: &str = "consignmentId";

/// Arguments of [`fetch_all_consignments`].
pub fn list_args(page_size: Option<i64>) -> CallArgs {
    offset_args(page_size).with(
        CallArgument::optional("since").description("Only consignments updated after this time"),
    )
}

/// Fetches one page of consignments.
pub async fn list_consignments(client: &VendClient, args: &CallArgs) -> Result<Value, ApiError> {
    client.get("listConsignments", "/api/consignment", args).await
}

/// Fetches every consignment.
pub async fn fetch_all_consignments(
    client: &VendClient,
    args: &mut CallArgs,
) -> Result<Vec<Value>, ApiError> {
    paginate(
        args,
        |page_args| async move { list_consignments(client, &page_args).await },
        |response, mut all: Vec<Value>| {
            all.extend(page_items(&response, "consignments"));
            Ok(all)
        },
        Vec::new(),
    )
    .await
}

/// Arguments of [`fetch_consignment_products`].
pub fn products_args(consignment_id: Option<&str>, page_size: Option<i64>) -> CallArgs {
    let mut id = CallArgument::required(CONSIGNMENT_ID_ARG)
        .wire_key("consignment_id")
        .description("Consignment whose products to list");
    if let Some(consignment_id) = consignment_id {
        id = id.value(json!(consignment_id));
    }
    offset_args(page_size).with(id)
}

/// Fetches every product line of one consignment.
pub async fn fetch_consignment_products(
    client: &VendClient,
    args: &mut CallArgs,
) -> Result<Vec<Value>, ApiError> {
    args.ensure_valid("fetchConsignmentProducts")?;
    paginate(
        args,
        |page_args| async move {
            client
                .get("fetchConsignmentProducts", "/api/consignment_product", &page_args)
                .await
        },
        |response, mut all: Vec<Value>| {
            all.extend(page_items(&response, "consignment_products"));
            Ok(all)
        },
        Vec::new(),
    )
    .await
}

/// Fetches the product lines of several consignments, one consignment at a
/// time, in the order given.
pub async fn fetch_products_for_consignments(
    client: &VendClient,
    consignment_ids: &[String],
    page_size: Option<i64>,
) -> Result<Vec<Value>, ApiError> {
    let Some(first) = consignment_ids.first() else {
        return Ok(Vec::new());
    };
    let mut shared = products_args(Some(first), page_size);

    let lines = run_serially(
        consignment_ids,
        0,
        &mut shared,
        |_, shared| {
            let mut args = shared.clone();
            async move { fetch_consignment_products(client, &mut args).await }
        },
        |lines, all: Option<Vec<Value>>, shared| {
            info!(
                consignment_id = shared.value_str(CONSIGNMENT_ID_ARG).unwrap_or_default(),
                lines = lines.len(),
                "fetched consignment products"
            );
            let mut all = all.unwrap_or_default();
            all.extend(lines);
            Ok(all)
        },
        |shared, next| {
            if let Some(id) = consignment_ids.get(next) {
                shared.set(CONSIGNMENT_ID_ARG, json!(id));
                shared.set(PAGE_ARG, json!(1));
                shared.unset(AFTER_ARG);
            }
        },
        None,
    )
    .await?;

    Ok(lines.unwrap_or_default())
}
