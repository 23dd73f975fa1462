//! Placeholder substitution over the flat context view.
//!
//! Only exact `{{key}}` and `{{context.key}}` placeholders are replaced.
//! Placeholders with no matching context key are left untouched. This is not a
//! template language: there are no filters, expressions or whitespace rules.

use std::collections::HashMap;

use thiserror::Error;

use crate::context::{flatten, WorkflowContext};

/// Placeholder substitution errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A referenced context value was `null`.
    #[error("Context value for '{0}' is null")]
    NullValue(String),
}

/// Resolve `key` or `context.key` to its context entry.
fn lookup<'v>(
    values: &'v HashMap<String, Option<String>>,
    name: &str,
) -> Option<(&'v String, &'v Option<String>)> {
    values.get_key_value(name).or_else(|| {
        name.strip_prefix("context.")
            .and_then(|key| values.get_key_value(key))
    })
}

/// Single left-to-right pass: substituted values are never rescanned.
fn substitute_with(
    text: &str,
    context: &WorkflowContext,
    reject_null: bool,
) -> Result<String, TemplateError> {
    if !text.contains("{{") {
        return Ok(text.to_string());
    }

    let values = flatten(context);

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let Some(len) = rest[open + 2..].find("}}") else {
            break;
        };
        let close = open + 2 + len;
        // Innermost opening pair before the close.
        let start = open + rest[open..close].rfind("{{").unwrap_or(0);
        let name = &rest[start + 2..close];

        result.push_str(&rest[..start]);
        match lookup(&values, name) {
            Some((_, Some(value))) => result.push_str(value),
            Some((key, None)) if reject_null => {
                return Err(TemplateError::NullValue(key.clone()));
            }
            Some((_, None)) => {}
            None => result.push_str(&rest[start..close + 2]),
        }
        rest = &rest[close + 2..];
    }
    result.push_str(rest);
    Ok(result)
}

/// Substitute placeholders, rendering `null` values as empty strings.
pub fn substitute(text: &str, context: &WorkflowContext) -> String {
    // Infallible when nulls are rendered empty.
    substitute_with(text, context, false).unwrap_or_else(|_| text.to_string())
}

/// Substitute placeholders, failing on any referenced `null` value.
pub fn substitute_strict(text: &str, context: &WorkflowContext) -> Result<String, TemplateError> {
    substitute_with(text, context, true)
}

/// Substitute placeholders in every string of a JSON value, recursively.
pub fn substitute_value(value: &serde_json::Value, context: &WorkflowContext) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(substitute(s, context)),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.iter().map(|v| substitute_value(v, context)).collect(),
        ),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}
