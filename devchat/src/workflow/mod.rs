//! Workflow records, persistence, dispatch and execution.

pub mod dispatch;
pub mod runner;
pub mod store;

pub use dispatch::{RunContext, StepDispatcher, StepKind, StepOutcome};
pub use runner::{RunError, RunOutcome, RunReport, StepResult, WorkflowRunner};
pub use store::WorkflowStore;

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named, typed unit of work with a free-form parameter bag.
///
/// The tag in `step_type` is resolved to a handler at dispatch time;
/// parameters are interpreted only by the matching handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(rename = "type")]
    pub step_type: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `config` accepted on input for definitions written against the
    /// older front end.
    #[serde(default, alias = "config", skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_yaml::Value>,
}

/// A named, ordered sequence of steps. Step order is execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The on-disk shape of a workflow definition file given to `create`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub description: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    /// Build a new workflow from a definition file, stamping creation time.
    pub fn from_definition(name: impl Into<String>, definition: WorkflowDefinition) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: definition.description,
            steps: definition.steps,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Replace the step sequence, stamping modification time.
    pub fn replace_steps(&mut self, definition: WorkflowDefinition) {
        if !definition.description.is_empty() {
            self.description = definition.description;
        }
        self.steps = definition.steps;
        self.updated_at = Some(Utc::now());
    }

    /// Reject malformed records before they reach persistence.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("workflow name must not be empty");
        }
        if self.name.contains(['/', '\\']) || self.name.contains("..") {
            bail!("workflow name '{}' must not contain path separators", self.name);
        }

        let mut seen = BTreeSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                bail!("every step needs a non-empty name");
            }
            if step.step_type.trim().is_empty() {
                bail!("step '{}' needs a non-empty type", step.name);
            }
            if !seen.insert(step.name.as_str()) {
                bail!("duplicate step name '{}' in workflow '{}'", step.name, self.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, step_type: &str) -> WorkflowStep {
        WorkflowStep {
            step_type: step_type.to_string(),
            name: name.to_string(),
            description: String::new(),
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn duplicate_step_names_are_rejected() {
        let workflow = Workflow {
            name: "dup".to_string(),
            description: String::new(),
            steps: vec![step("s1", "ask"), step("s1", "document")],
            created_at: None,
            updated_at: None,
        };
        let err = workflow.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate step name 's1'"));
    }

    #[test]
    fn name_with_path_separator_is_rejected() {
        let workflow = Workflow {
            name: "../escape".to_string(),
            description: String::new(),
            steps: vec![step("s1", "ask")],
            created_at: None,
            updated_at: None,
        };
        assert!(workflow.validate().is_err());
    }

    #[test]
    fn definition_accepts_config_alias_for_parameters() {
        let yaml = "\
description: docs for everything
steps:
  - type: document
    name: d1
    description: document the module
    config:
      file: a.py
";
        let definition: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(definition.steps.len(), 1);
        assert_eq!(
            definition.steps[0].parameters.get("file").and_then(|v| v.as_str()),
            Some("a.py")
        );
    }

    #[test]
    fn empty_step_type_is_rejected() {
        let workflow = Workflow {
            name: "wf".to_string(),
            description: String::new(),
            steps: vec![step("s1", " ")],
            created_at: None,
            updated_at: None,
        };
        assert!(workflow.validate().is_err());
    }
}
