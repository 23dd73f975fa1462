//! Condition evaluation for condition steps.
//!
//! A condition is true when, after `{{key}}` substitution, its text contains a
//! comparison operator. Operands are never compared. Any substitution error
//! makes the condition false.

use bss_workflow_actions::template::{substitute_strict, TemplateError};
use bss_workflow_actions::WorkflowContext;

/// Operators whose presence makes a condition true.
pub const COMPARISON_OPERATORS: [&str; 4] = ["==", "!=", ">", "<"];

/// Condition evaluator for condition steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a condition; errors yield `false`.
    pub fn evaluate(&self, condition: &str, context: &WorkflowContext) -> bool {
        match self.try_evaluate(condition, context) {
            Ok(result) => {
                tracing::debug!(condition = %condition, result, "Condition evaluated");
                result
            }
            Err(e) => {
                tracing::warn!(condition = %condition, error = %e, "Failed to evaluate condition");
                false
            }
        }
    }

    /// Evaluate a condition, surfacing substitution errors.
    pub fn try_evaluate(
        &self,
        condition: &str,
        context: &WorkflowContext,
    ) -> Result<bool, TemplateError> {
        let rendered = substitute_strict(condition, context)?;
        Ok(COMPARISON_OPERATORS
            .iter()
            .any(|operator| rendered.contains(operator)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn ctx(pairs: &[(&str, Value)]) -> WorkflowContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_comparison_after_substitution_is_true() {
        let evaluator = ConditionEvaluator::new();
        assert!(evaluator.evaluate("{{amount}} > 100", &ctx(&[("amount", json!(150))])));
    }

    #[test]
    fn test_text_without_operator_is_false() {
        let evaluator = ConditionEvaluator::new();
        assert!(!evaluator.evaluate("no operators here", &ctx(&[("amount", json!(150))])));
        assert!(!evaluator.evaluate("no operators here", &WorkflowContext::new()));
    }

    #[test]
    fn test_operands_are_not_compared() {
        let evaluator = ConditionEvaluator::new();
        let context = ctx(&[("status", json!("PENDING"))]);
        assert!(evaluator.evaluate("{{status}} == ACTIVE", &context));
        assert!(evaluator.evaluate("{{status}} != PENDING", &context));
        assert!(evaluator.evaluate("1 < 0", &context));
    }

    #[test]
    fn test_operator_introduced_by_substitution() {
        let evaluator = ConditionEvaluator::new();
        let context = ctx(&[("rule", json!("tier >= gold"))]);
        assert!(evaluator.evaluate("{{rule}}", &context));
    }

    #[test]
    fn test_null_reference_is_false() {
        let evaluator = ConditionEvaluator::new();
        let context = ctx(&[("status", Value::Null)]);
        assert!(!evaluator.evaluate("{{status}} == ACTIVE", &context));
        assert_eq!(
            evaluator.try_evaluate("{{status}} == ACTIVE", &context),
            Err(TemplateError::NullValue("status".to_string()))
        );
    }

    #[test]
    fn test_only_referenced_nulls_make_condition_false() {
        let evaluator = ConditionEvaluator::new();
        let context = ctx(&[("status", json!("ACTIVE")), ("nickname", Value::Null)]);
        assert!(evaluator.evaluate("{{status}} == ACTIVE", &context));
        assert!(!evaluator.evaluate("{{nickname}} == bob", &context));
    }

    #[test]
    fn test_empty_condition_is_false() {
        assert!(!ConditionEvaluator::new().evaluate("", &WorkflowContext::new()));
    }
}
