//
//  vend-client
//  cli/api.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! `vend api`: authenticated requests to any API path.
//!
//! Requests go through the same dispatcher as the library, so they are
//! retried on connection failures, rate limits and expired tokens.
//!
//! ```text
//! vend api /api/2.0/products --paginate --page-size 200
//! vend api /api/products -X POST -F name=Latte -F supply_price=1.5
//! vend api /api/consignment_product -F consignment_id=abc --paginate
//! ```

use std::fs;

use anyhow::{bail, Result};
use clap::Args;
use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::api::args::{CallArgs, CallArgument};
use crate::api::common::{page_items_any, paginate, PAGE_ARG, PAGE_SIZE_ARG};
use crate::api::{ApiError, RequestSpec};
use crate::auth::ConnectionInfo;

use super::{open_client, GlobalOptions};

/// Make an authenticated API request
#[derive(Args, Debug)]
pub struct ApiCommand {
    /// API path, e.g. /api/2.0/products
    pub endpoint: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Extra header, "Name: Value" (repeatable)
    #[arg(long, short = 'H', action = clap::ArgAction::Append)]
    pub header: Vec<String>,

    /// Parameter key=value with JSON typing; query string for GET and
    /// DELETE, body otherwise. Dotted keys nest in the body.
    #[arg(long, short = 'F', action = clap::ArgAction::Append)]
    pub field: Vec<String>,

    /// Parameter key=value sent as a string
    #[arg(long, action = clap::ArgAction::Append)]
    pub raw_field: Vec<String>,

    /// Read the JSON body from a file ("-" for stdin)
    #[arg(long, short = 'f')]
    pub input: Option<String>,

    /// Fetch every page and print the combined items
    #[arg(long)]
    pub paginate: bool,

    /// Records per page when paginating
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

impl ApiCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let method = parse_method(&self.method)?;
        let headers = parse_headers(&self.header)?;
        let fields = self.fields()?;
        let in_query = matches!(method, Method::GET | Method::DELETE);

        let body = match self.read_input()? {
            Some(body) => Some(body),
            None if !in_query && !fields.is_empty() => Some(build_body(&fields)),
            None => None,
        };

        let mut args: CallArgs = if in_query {
            fields
                .iter()
                .map(|(key, value)| CallArgument::optional(key).value(value.clone()))
                .collect()
        } else {
            CallArgs::new()
        };

        let client = open_client(global)?;
        let endpoint = self.endpoint.as_str();
        let build = |args: &CallArgs, info: &ConnectionInfo| -> Result<RequestSpec, ApiError> {
            let mut spec = RequestSpec::new(method.clone(), info.api_url(endpoint)).authorized(info)?;
            for (name, value) in &headers {
                spec = spec.header(name, value)?;
            }
            if in_query {
                spec = spec.with_query(args.query_pairs());
            }
            if let Some(body) = &body {
                spec = spec.with_json(body.clone());
            }
            Ok(spec)
        };

        let output = if self.paginate {
            if !in_query {
                bail!("--paginate is only supported for GET requests");
            }
            if args.value(PAGE_ARG).is_none() {
                args.insert(CallArgument::optional(PAGE_ARG).value(json!(1)));
            }
            if let Some(page_size) = self.page_size {
                args.insert(
                    CallArgument::optional(PAGE_SIZE_ARG)
                        .wire_key("page_size")
                        .value(json!(page_size)),
                );
            }

            let items = paginate(
                &mut args,
                |page_args| {
                    let client = &client;
                    let build = &build;
                    async move { client.dispatch("api", &page_args, build).await }
                },
                |response, mut all: Vec<Value>| {
                    all.extend(page_items_any(&response));
                    Ok(all)
                },
                Vec::new(),
            )
            .await?;

            let mut result = json!({ "size": items.len(), "data": items });
            if let Some(after) = args.value_i64("after") {
                result["after"] = json!(after);
            }
            result
        } else {
            client.dispatch("api", &args, &build).await?
        };

        if self.compact {
            println!("{}", output);
        } else {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Ok(())
    }

    fn fields(&self) -> Result<Vec<(String, Value)>> {
        let mut fields = Vec::new();
        for field in &self.field {
            let (key, value) = split_field(field)?;
            fields.push((key.to_string(), parse_value(value)));
        }
        for field in &self.raw_field {
            let (key, value) = split_field(field)?;
            fields.push((key.to_string(), Value::String(value.to_string())));
        }
        Ok(fields)
    }

    fn read_input(&self) -> Result<Option<Value>> {
        let Some(input) = &self.input else {
            return Ok(None);
        };
        let content = if input == "-" {
            let mut buffer = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
            buffer
        } else {
            fs::read_to_string(input)?
        };
        Ok(Some(serde_json::from_str(&content)?))
    }
}

fn parse_method(method: &str) -> Result<Method> {
    match method.to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        _ => bail!("Unsupported HTTP method: {}", method),
    }
}

fn parse_headers(headers: &[String]) -> Result<Vec<(String, String)>> {
    headers
        .iter()
        .map(|header| match header.split_once(':') {
            Some((name, value)) => Ok((name.trim().to_string(), value.trim().to_string())),
            None => bail!("Invalid header format: {}. Expected 'Name: Value'", header),
        })
        .collect()
}

fn split_field(field: &str) -> Result<(&str, &str)> {
    match field.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("Invalid field format: {}. Expected key=value", field),
    }
}

/// Types a field value: booleans, null, numbers and JSON literals; anything
/// else is a string.
fn parse_value(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if let Ok(n) = value.parse::<i64>() {
                return Value::Number(n.into());
            }
            if let Ok(n) = value.parse::<f64>() {
                if let Some(n) = serde_json::Number::from_f64(n) {
                    return Value::Number(n);
                }
            }
            if value.starts_with('[') || value.starts_with('{') {
                if let Ok(json) = serde_json::from_str(value) {
                    return json;
                }
            }
            Value::String(value.to_string())
        }
    }
}

fn build_body(fields: &[(String, Value)]) -> Value {
    let mut body = Map::new();
    for (key, value) in fields {
        set_nested_value(&mut body, key, value.clone());
    }
    Value::Object(body)
}

fn set_nested_value(obj: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            obj.insert(key.to_string(), value);
        }
        Some((first, rest)) => {
            let nested = obj
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !nested.is_object() {
                *nested = Value::Object(Map::new());
            }
            if let Value::Object(nested) = nested {
                set_nested_value(nested, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_types() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("1.5"), json!(1.5));
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("[1,2]"), json!([1, 2]));
        assert_eq!(parse_value("Flat White"), json!("Flat White"));
        assert_eq!(parse_value("{not json"), json!("{not json"));
    }

    #[test]
    fn test_build_body_nests_dotted_keys() {
        let body = build_body(&[
            ("name".to_string(), json!("Latte")),
            ("price.retail".to_string(), json!(4.5)),
            ("price.supply".to_string(), json!(1.5)),
        ]);
        assert_eq!(
            body,
            json!({"name": "Latte", "price": {"retail": 4.5, "supply": 1.5}})
        );
    }

    #[test]
    fn test_split_field_requires_key() {
        assert!(split_field("=value").is_err());
        assert!(split_field("novalue").is_err());
        assert_eq!(split_field("a=b=c").unwrap(), ("a", "b=c"));
    }

    #[test]
    fn test_parse_method_and_headers() {
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert!(parse_method("TRACE").is_err());
        assert_eq!(
            parse_headers(&["X-Request-Id: 7".to_string()]).unwrap(),
            vec![("X-Request-Id".to_string(), "7".to_string())]
        );
        assert!(parse_headers(&["broken".to_string()]).is_err());
    }
}
