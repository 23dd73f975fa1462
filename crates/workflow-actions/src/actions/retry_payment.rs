//! Payment retry action.

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;

use super::now_rfc3339;
use crate::context::{get_str, WorkflowContext};
use crate::error::ActionError;
use crate::registry::{ActionConfig, ActionHandler, ActionKind, ActionOutput};

/// Error reported when the simulated gateway declines a retry.
pub const GATEWAY_TIMEOUT: &str = "Payment gateway timeout";

/// Retries the context's `payment_id` against a simulated gateway.
///
/// A declined retry is reported as `status: failed` in the output; the action
/// itself never fails.
pub struct RetryPaymentAction {
    delay: Duration,
    success_rate: f64,
}

impl RetryPaymentAction {
    pub fn new(delay: Duration, success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self {
            delay,
            success_rate,
        }
    }
}

#[async_trait]
impl ActionHandler for RetryPaymentAction {
    fn kind(&self) -> ActionKind {
        ActionKind::RetryPayment
    }

    async fn execute(
        &self,
        _config: &ActionConfig,
        context: &WorkflowContext,
    ) -> Result<ActionOutput, ActionError> {
        let customer_id = get_str(context, "customer_id");
        let payment_id = get_str(context, "payment_id");

        tracing::info!(
            payment_id = ?payment_id,
            customer_id = ?customer_id,
            "Retrying payment"
        );

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let success = rand::thread_rng().gen_bool(self.success_rate);

        let mut out = ActionOutput::new();
        out.insert(
            "status".to_string(),
            Value::from(if success { "success" } else { "failed" }),
        );
        out.insert("customer_id".to_string(), Value::from(customer_id));
        out.insert("payment_id".to_string(), Value::from(payment_id.clone()));
        out.insert("attempted_at".to_string(), Value::from(now_rfc3339()));
        out.insert("retry_count".to_string(), Value::from(1));

        if !success {
            tracing::warn!(payment_id = ?payment_id, "Payment retry declined");
            out.insert("error".to_string(), Value::from(GATEWAY_TIMEOUT));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> WorkflowContext {
        let mut ctx = WorkflowContext::new();
        ctx.insert("customer_id".to_string(), json!("c-1"));
        ctx.insert("payment_id".to_string(), json!("p-1"));
        ctx
    }

    #[tokio::test]
    async fn test_retry_payment_always_succeeds_at_full_rate() {
        let action = RetryPaymentAction::new(Duration::ZERO, 1.0);
        let out = action.execute(&ActionConfig::new(), &ctx()).await.unwrap();

        assert_eq!(out["status"], json!("success"));
        assert_eq!(out["payment_id"], json!("p-1"));
        assert_eq!(out["retry_count"], json!(1));
        assert!(!out.contains_key("error"));
    }

    #[tokio::test]
    async fn test_retry_payment_reports_failure_without_error() {
        let action = RetryPaymentAction::new(Duration::ZERO, 0.0);
        let out = action.execute(&ActionConfig::new(), &ctx()).await.unwrap();

        assert_eq!(out["status"], json!("failed"));
        assert_eq!(out["error"], json!(GATEWAY_TIMEOUT));
    }

    #[tokio::test]
    async fn test_retry_payment_failure_rate_is_about_ten_percent() {
        let action = RetryPaymentAction::new(Duration::ZERO, 0.9);
        let context = ctx();

        let mut failures = 0;
        for _ in 0..1000 {
            let out = action.execute(&ActionConfig::new(), &context).await.unwrap();
            if out["status"] == json!("failed") {
                assert_eq!(out["error"], json!(GATEWAY_TIMEOUT));
                failures += 1;
            }
        }

        // Binomial(1000, 0.1) has a standard deviation of ~9.5; allow ~5 sigma.
        assert!((50..=150).contains(&failures), "failures = {}", failures);
    }

    #[test]
    fn test_success_rate_is_clamped() {
        assert_eq!(RetryPaymentAction::new(Duration::ZERO, 3.0).success_rate, 1.0);
        assert_eq!(RetryPaymentAction::new(Duration::ZERO, -1.0).success_rate, 0.0);
    }
}
