//! Workflow execution context helpers.
//!
//! The context is the string-keyed map seeded from the triggering event plus
//! the standard fields (`entity_type`, `entity_id`, `triggered_at`). Conditions
//! and action configuration only ever see it through a flat string view.

use std::collections::HashMap;

use serde_json::Value;

/// Context map visible to condition evaluation and action configuration.
pub type WorkflowContext = HashMap<String, Value>;

/// Render a context value the way placeholders expect it.
///
/// Strings are used verbatim (no surrounding quotes), `null` renders empty and
/// everything else uses its JSON text.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Look up a context entry as a string.
pub fn get_str(context: &WorkflowContext, key: &str) -> Option<String> {
    match context.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value_to_string(value)),
    }
}

/// Flatten the context into a string view.
///
/// `null` entries are kept with an empty rendering so callers can tell them
/// apart from absent keys.
pub fn flatten(context: &WorkflowContext) -> HashMap<String, Option<String>> {
    context
        .iter()
        .map(|(k, v)| {
            let rendered = match v {
                Value::Null => None,
                other => Some(value_to_string(other)),
            };
            (k.clone(), rendered)
        })
        .collect()
}
