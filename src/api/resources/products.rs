//
//  vend-client
//  api/resources/products.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Products.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | [`fetch_product`] | `GET /api/2.0/products/{id}` |
//! | [`list_products`] | `GET /api/2.0/products` (one page) |
//! | [`fetch_all_products`] | `GET /api/2.0/products` (every page) |
//! | [`create_product`] | `POST /api/products` |

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{version_args, DataEnvelope};
use crate::api::args::{CallArgs, CallArgument};
use crate::api::client::VendClient;
use crate::api::common::{page_items, paginate, ApiError};
use crate::api::request::RequestSpec;
use crate::auth::ConnectionInfo;

const PRODUCT_ID_ARG: &str = "productId";
const BODY_ARG: &str = "body";

/// A product as returned by the 2.0 API.
///
/// Only the fields this crate reads are typed; everything else is kept in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub deleted_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Arguments of [`fetch_product`].
pub fn fetch_args(product_id: Option<&str>) -> CallArgs {
    let mut id = CallArgument::required(PRODUCT_ID_ARG).description("Id of the product to fetch");
    if let Some(product_id) = product_id {
        id = id.value(json!(product_id));
    }
    CallArgs::new().with(id)
}

/// Arguments of [`list_products`] and [`fetch_all_products`].
pub fn list_args(after: Option<i64>, page_size: Option<i64>) -> CallArgs {
    version_args(after, page_size)
}

/// Fetches one product by id.
pub async fn fetch_product(client: &VendClient, args: &CallArgs) -> Result<Product, ApiError> {
    let envelope: DataEnvelope<Product> = client
        .dispatch_as("fetchProduct", args, |args, info| {
            let id = args.value_str(PRODUCT_ID_ARG).unwrap_or_default();
            RequestSpec::get(product_url(info, id)?).authorized(info)
        })
        .await?;
    Ok(envelope.data)
}

/// URL of one product, with the id encoded as a single path segment.
fn product_url(info: &ConnectionInfo, id: &str) -> Result<String, ApiError> {
    let mut url = url::Url::parse(&info.api_url("/api/2.0/products"))
        .map_err(|e| ApiError::InvalidRequest(format!("url: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidRequest("api base cannot carry a path".into()))?
        .push(id);
    Ok(url.to_string())
}

/// Fetches a single page of products.
pub async fn list_products(client: &VendClient, args: &CallArgs) -> Result<Value, ApiError> {
    client.get("listProducts", "/api/2.0/products", args).await
}

/// Fetches every product after `args.after`.
///
/// On return `args.after` holds the highest version seen, ready for the next
/// incremental sync.
pub async fn fetch_all_products(
    client: &VendClient,
    args: &mut CallArgs,
) -> Result<Vec<Product>, ApiError> {
    paginate(
        args,
        |page_args| async move { list_products(client, &page_args).await },
        |response, mut products: Vec<Product>| {
            for item in page_items(&response, "data") {
                products.push(serde_json::from_value(item)?);
            }
            Ok(products)
        },
        Vec::new(),
    )
    .await
}

/// Arguments of [`create_product`].
pub fn create_args(body: Option<Value>) -> CallArgs {
    let mut argument = CallArgument::required(BODY_ARG).description("Product to create");
    if let Some(body) = body {
        argument = argument.value(body);
    }
    CallArgs::new().with(argument)
}

/// Creates (or, when the body carries an `id`, updates) a product.
pub async fn create_product(client: &VendClient, args: &CallArgs) -> Result<Value, ApiError> {
    client
        .dispatch("createProduct", args, |args, info| {
            let body = args.value(BODY_ARG).cloned().unwrap_or(Value::Null);
            Ok(RequestSpec::post(info.api_url("/api/products"))
                .authorized(info)?
                .with_json(body))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_url_encodes_id() {
        let info = ConnectionInfo::new("mystore", "tok");
        assert_eq!(
            product_url(&info, "abc").unwrap(),
            "https://mystore.vendhq.com/api/2.0/products/abc"
        );
        assert_eq!(
            product_url(&info, "a/b c?").unwrap(),
            "https://mystore.vendhq.com/api/2.0/products/a%2Fb%20c%3F"
        );
    }

    #[test]
    fn test_fetch_args_require_id() {
        assert!(!fetch_args(None).is_valid());
        assert!(fetch_args(Some("abc")).is_valid());
    }

    #[test]
    fn test_product_keeps_unknown_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": "abc",
            "name": "Flat White",
            "version": 12,
            "supply_price": 1.5
        }))
        .unwrap();
        assert_eq!(product.name.as_deref(), Some("Flat White"));
        assert_eq!(product.extra["supply_price"], json!(1.5));
    }

    #[test]
    fn test_create_args_require_body() {
        assert!(!create_args(None).is_valid());
        assert!(create_args(Some(json!({"name": "Latte"}))).is_valid());
    }
}
