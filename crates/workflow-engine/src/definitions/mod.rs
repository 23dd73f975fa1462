//! Workflow definitions loaded from YAML.
//!
//! A definitions document has a single top-level `workflows` list:
//!
//! ```yaml
//! workflows:
//!   - name: customer_onboarding
//!     steps:
//!       - name: check_customer_active
//!         type: condition
//!         config:
//!           condition: "{{status}} == ACTIVE"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::db::models::WorkflowDefinition;
use crate::db::store::WorkflowDefinitionStore;
use crate::engine::step::StepSpec;
use crate::error::{AppError, AppResult};

const BUILTIN_DEFINITIONS: &str = include_str!("builtin.yaml");

#[derive(Debug, Deserialize)]
struct DefinitionsDocument {
    #[serde(default)]
    workflows: Vec<WorkflowDefinition>,
}

/// Parse and validate a definitions document.
pub fn parse_definitions(yaml_content: &str) -> AppResult<Vec<WorkflowDefinition>> {
    let document: DefinitionsDocument = serde_yaml::from_str(yaml_content)?;
    validate_definitions(&document.workflows)?;
    Ok(document.workflows)
}

/// Check names are present and unique, and every step's config decodes for
/// its step type.
pub fn validate_definitions(definitions: &[WorkflowDefinition]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for definition in definitions {
        if definition.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Workflow definition has an empty name".to_string(),
            ));
        }
        if !seen.insert(definition.name.as_str()) {
            return Err(AppError::Validation(format!(
                "Duplicate workflow name: {}",
                definition.name
            )));
        }

        let mut step_names = HashSet::new();
        for step in &definition.steps {
            if !step_names.insert(step.name.as_str()) {
                return Err(AppError::Validation(format!(
                    "Workflow '{}': duplicate step name: {}",
                    definition.name, step.name
                )));
            }
            StepSpec::decode(step.step_type, &step.config).map_err(|e| {
                AppError::Validation(format!(
                    "Workflow '{}', step '{}': {}",
                    definition.name, step.name, e
                ))
            })?;
        }
    }
    Ok(())
}

/// Read a definitions file.
pub async fn load_definitions_file(path: impl AsRef<Path>) -> AppResult<Vec<WorkflowDefinition>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Config(format!(
            "Failed to read workflow definitions from {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_definitions(&content)
}

/// The `customer_onboarding` and `payment_failed_recovery` workflows.
pub fn builtin_definitions() -> AppResult<Vec<WorkflowDefinition>> {
    parse_definitions(BUILTIN_DEFINITIONS)
}

/// Add definitions whose names the store does not know yet. Stored
/// definitions are left as they are. Returns the number added.
pub async fn seed_definitions(
    store: &dyn WorkflowDefinitionStore,
    definitions: &[WorkflowDefinition],
) -> AppResult<usize> {
    let mut added = 0;
    for definition in definitions {
        if store.insert_if_absent(definition).await? {
            added += 1;
            tracing::info!(
                workflow = %definition.name,
                steps = definition.steps.len(),
                active = definition.active,
                "Registered workflow definition"
            );
        } else {
            tracing::debug!(workflow = %definition.name, "Workflow definition already stored");
        }
    }
    Ok(added)
}

/// Save definitions into a store, replacing any with the same name.
pub async fn replace_definitions(
    store: &dyn WorkflowDefinitionStore,
    definitions: &[WorkflowDefinition],
) -> AppResult<usize> {
    for definition in definitions {
        store.save(definition).await?;
        tracing::info!(
            workflow = %definition.name,
            steps = definition.steps.len(),
            active = definition.active,
            "Replaced workflow definition"
        );
    }
    Ok(definitions.len())
}
