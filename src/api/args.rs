//
//  vend-client
//  api/args.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Call arguments and their validation.
//!
//! Every collaborator declares the arguments a call accepts as a [`CallArgs`]
//! set. Each entry says whether it is required, which key it uses on the wire,
//! and carries an optional value. The set is checked with
//! [`CallArgs::is_valid`] before any request is built; a call whose required
//! arguments are missing fails fast with [`ApiError::MissingArguments`] and
//! never reaches the network.
//!
//! # Example
//!
//! ```rust
//! use vend_client::api::args::{CallArgs, CallArgument};
//! use serde_json::json;
//!
//! let mut args = CallArgs::new()
//!     .with(CallArgument::required("productId").wire_key("id"))
//!     .with(CallArgument::optional("pageSize").wire_key("page_size").value(json!(200)));
//!
//! assert!(!args.is_valid());
//! args.set("productId", json!("abc"));
//! assert!(args.is_valid());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::ApiError;

/// A single named parameter of an API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallArgument {
    /// Name used by callers to address the argument.
    pub name: String,

    /// Whether the call may be dispatched without a value.
    pub required: bool,

    /// Query-string key, when it differs from `name`.
    #[serde(default)]
    pub wire_key: Option<String>,

    /// The value; `None` means undefined.
    #[serde(default)]
    pub value: Option<Value>,

    /// Human-readable description, used in CLI help and logs.
    #[serde(default)]
    pub description: Option<String>,
}

impl CallArgument {
    /// Declares a required argument with no value yet.
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            wire_key: None,
            value: None,
            description: None,
        }
    }

    /// Declares an optional argument with no value yet.
    pub fn optional(name: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    pub fn wire_key(mut self, key: &str) -> Self {
        self.wire_key = Some(key.to_string());
        self
    }

    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// The key this argument is sent under.
    pub fn key(&self) -> &str {
        self.wire_key.as_deref().unwrap_or(&self.name)
    }

    /// Returns `true` if the argument is required but has no value.
    pub fn is_missing(&self) -> bool {
        self.required && self.value.is_none()
    }
}

/// The full argument set of one call, keyed by argument name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArgs {
    args: BTreeMap<String, CallArgument>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an argument declaration.
    pub fn with(mut self, argument: CallArgument) -> Self {
        self.insert(argument);
        self
    }

    pub fn insert(&mut self, argument: CallArgument) {
        self.args.insert(argument.name.clone(), argument);
    }

    pub fn get(&self, name: &str) -> Option<&CallArgument> {
        self.args.get(name)
    }

    /// Returns the value of an argument, if it is declared and defined.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.args.get(name).and_then(|a| a.value.as_ref())
    }

    pub fn value_i64(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_i64)
    }

    pub fn value_str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    /// Sets the value of an argument.
    ///
    /// Undeclared names are added as optional arguments so that engines such
    /// as pagination can introduce cursor arguments on the fly.
    pub fn set(&mut self, name: &str, value: Value) {
        self.args
            .entry(name.to_string())
            .or_insert_with(|| CallArgument::optional(name))
            .value = Some(value);
    }

    /// Clears the value of an argument, leaving its declaration in place.
    pub fn unset(&mut self, name: &str) {
        if let Some(argument) = self.args.get_mut(name) {
            argument.value = None;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallArgument> {
        self.args.values()
    }

    /// Returns `false` iff any required argument has no value.
    pub fn is_valid(&self) -> bool {
        !self.args.values().any(CallArgument::is_missing)
    }

    /// Names of the required arguments that have no value.
    pub fn missing(&self) -> Vec<&str> {
        self.args
            .values()
            .filter(|a| a.is_missing())
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Fails with [`ApiError::MissingArguments`] naming `operation` when the
    /// set is not valid.
    pub fn ensure_valid(&self, operation: &str) -> Result<(), ApiError> {
        if self.is_valid() {
            Ok(())
        } else {
            tracing::debug!(operation, missing = ?self.missing(), "argument validation failed");
            Err(ApiError::MissingArguments(operation.to_string()))
        }
    }

    /// Valued arguments as query-string pairs, keyed by their wire key.
    ///
    /// Strings are sent as-is; other JSON values use their JSON rendering.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.args
            .values()
            .filter_map(|a| {
                let value = a.value.as_ref()?;
                let rendered = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((a.key().to_string(), rendered))
            })
            .collect()
    }
}

impl FromIterator<CallArgument> for CallArgs {
    fn from_iter<I: IntoIterator<Item = CallArgument>>(iter: I) -> Self {
        let mut args = Self::new();
        for argument in iter {
            args.insert(argument);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_set_is_valid() {
        assert!(CallArgs::new().is_valid());
    }

    #[test]
    fn test_missing_required_is_invalid() {
        let args = CallArgs::new()
            .with(CallArgument::required("consignmentId"))
            .with(CallArgument::optional("page").value(json!(1)));
        assert!(!args.is_valid());
        assert_eq!(args.missing(), vec!["consignmentId"]);
    }

    #[test]
    fn test_optional_values_do_not_matter() {
        let args = CallArgs::new()
            .with(CallArgument::required("consignmentId").value(json!("c-1")))
            .with(CallArgument::optional("page"))
            .with(CallArgument::optional("pageSize"));
        assert!(args.is_valid());
    }

    #[test]
    fn test_null_counts_as_defined() {
        let args = CallArgs::new().with(CallArgument::required("since").value(Value::Null));
        assert!(args.is_valid());
    }

    #[test]
    fn test_ensure_valid_names_operation() {
        let args = CallArgs::new().with(CallArgument::required("productId"));
        let err = args.ensure_valid("fetchProduct").unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required arguments for fetchProduct()"
        );
    }

    #[test]
    fn test_set_declares_unknown_arguments() {
        let mut args = CallArgs::new();
        args.set("after", json!(42));
        assert_eq!(args.value_i64("after"), Some(42));
        assert!(!args.get("after").unwrap().required);
    }

    #[test]
    fn test_query_pairs_use_wire_keys() {
        let args = CallArgs::new()
            .with(CallArgument::optional("pageSize").wire_key("page_size").value(json!(50)))
            .with(CallArgument::optional("name").value(json!("coffee")))
            .with(CallArgument::optional("unused"));
        let mut pairs = args.query_pairs();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), "coffee".to_string()),
                ("page_size".to_string(), "50".to_string()),
            ]
        );
    }
}
