//! Action execution error types.

use thiserror::Error;

/// Errors raised by action handlers.
///
/// Only errors the owning step should fail on are raised; handlers that
/// model an unsuccessful outcome (a declined payment retry, an unknown action)
/// report it in their result map instead.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Mail delivery failed.
    #[error("Failed to send email: {0}")]
    Mail(String),

    /// Handler configuration was missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Placeholder substitution failed.
    #[error("Template error: {0}")]
    Template(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        ActionError::Json(e.to_string())
    }
}

impl From<crate::template::TemplateError> for ActionError {
    fn from(e: crate::template::TemplateError) -> Self {
        ActionError::Template(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ActionError::Mail("connection refused".to_string());
        assert_eq!(err.to_string(), "Failed to send email: connection refused");

        let err = ActionError::Configuration("missing 'to'".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing 'to'");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let action_err: ActionError = json_err.into();
        assert!(matches!(action_err, ActionError::Json(_)));
    }
}
