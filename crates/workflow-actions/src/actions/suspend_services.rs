//! Service suspension scheduling action.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::context::{get_str, WorkflowContext};
use crate::error::ActionError;
use crate::registry::{ActionConfig, ActionHandler, ActionKind, ActionOutput};

/// Schedules suspension of the context customer's services `delay_days`
/// from now (default 0). Never fails.
#[derive(Debug, Default)]
pub struct SuspendServicesAction;

impl SuspendServicesAction {
    pub fn new() -> Self {
        Self
    }
}

/// Longest suspension delay, in days.
const MAX_DELAY_DAYS: i64 = 36_500;

/// Accepts a number or a numeric string; anything else is 0. Clamped to
/// `0..=MAX_DELAY_DAYS`.
fn delay_days(config: &ActionConfig) -> i64 {
    match config.get("delay_days") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
    .clamp(0, MAX_DELAY_DAYS)
}

#[async_trait]
impl ActionHandler for SuspendServicesAction {
    fn kind(&self) -> ActionKind {
        ActionKind::SuspendServices
    }

    async fn execute(
        &self,
        config: &ActionConfig,
        context: &WorkflowContext,
    ) -> Result<ActionOutput, ActionError> {
        let customer_id = get_str(context, "customer_id");
        let delay_days = delay_days(config);
        let suspend_at = Duration::try_days(delay_days)
            .and_then(|delay| Utc::now().checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        if delay_days > 0 {
            tracing::info!(
                customer_id = ?customer_id,
                delay_days,
                "Services will be suspended later"
            );
        } else {
            tracing::info!(customer_id = ?customer_id, "Suspending services");
        }

        let mut out = ActionOutput::new();
        out.insert("status".to_string(), Value::from("scheduled"));
        out.insert("customer_id".to_string(), Value::from(customer_id));
        out.insert("suspend_at".to_string(), Value::from(suspend_at.to_rfc3339()));
        out.insert("delay_days".to_string(), Value::from(delay_days));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::assert_ok;

    #[test]
    fn test_delay_days_parsing() {
        let parse = |v: Value| delay_days(v.as_object().unwrap());
        assert_eq!(parse(json!({})), 0);
        assert_eq!(parse(json!({"delay_days": 7})), 7);
        assert_eq!(parse(json!({"delay_days": "3"})), 3);
        assert_eq!(parse(json!({"delay_days": "soon"})), 0);
        assert_eq!(parse(json!({"delay_days": -2})), 0);
        assert_eq!(parse(json!({"delay_days": 100_000_000})), MAX_DELAY_DAYS);
        assert_eq!(parse(json!({"delay_days": "100000000"})), MAX_DELAY_DAYS);
        assert_eq!(parse(json!({"delay_days": 1e300})), MAX_DELAY_DAYS);
    }

    #[tokio::test]
    async fn test_huge_delay_is_capped() {
        for config in [
            json!({"delay_days": 100_000_000}),
            json!({"delay_days": "9223372036854775807"}),
        ] {
            let out = assert_ok!(
                SuspendServicesAction::new()
                    .execute(config.as_object().unwrap(), &WorkflowContext::new())
                    .await
            );

            assert_eq!(out["status"], json!("scheduled"));
            assert_eq!(out["delay_days"], json!(MAX_DELAY_DAYS));
            let suspend_at: DateTime<Utc> = out["suspend_at"].as_str().unwrap().parse().unwrap();
            assert!(suspend_at > Utc::now() + Duration::days(MAX_DELAY_DAYS - 1));
        }
    }

    #[tokio::test]
    async fn test_suspend_services_schedules_in_future() {
        let config = json!({"delay_days": 7});
        let before = Utc::now();
        let out = SuspendServicesAction::new()
            .execute(config.as_object().unwrap(), &WorkflowContext::new())
            .await
            .unwrap();

        assert_eq!(out["status"], json!("scheduled"));
        assert_eq!(out["delay_days"], json!(7));

        let suspend_at: DateTime<Utc> = out["suspend_at"].as_str().unwrap().parse().unwrap();
        assert!(suspend_at >= before + Duration::days(7));
    }
}
