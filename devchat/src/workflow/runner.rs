//! Run coordination: execute a workflow's steps strictly in declaration
//! order, collect per-step outcomes, and never discard partial progress.

use anyhow::Result;
use tracing::{error, info};

use super::dispatch::{RunContext, StepDispatcher, StepOutcome};
use super::store::WorkflowStore;
use super::Workflow;

/// One step's recorded result, keyed by the step's unique name.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub name: String,
    pub outcome: StepOutcome,
}

/// The failing step and what went wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct RunError {
    pub step: String,
    pub message: String,
}

/// Aggregated result of one workflow run.
///
/// On failure, `results` holds the outcomes collected before the
/// failing step.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub workflow: String,
    pub success: bool,
    pub results: Vec<StepResult>,
    pub error: Option<RunError>,
}

impl RunReport {
    pub fn outcome(&self, step_name: &str) -> Option<&StepOutcome> {
        self.results
            .iter()
            .find(|result| result.name == step_name)
            .map(|result| &result.outcome)
    }
}

/// Result of asking the coordinator to run a named workflow.
#[derive(Debug)]
pub enum RunOutcome {
    /// No record exists for the requested name; reported as data, not
    /// as an error.
    NotFound { name: String },
    Finished(RunReport),
}

pub struct WorkflowRunner {
    store: WorkflowStore,
    dispatcher: StepDispatcher,
}

impl WorkflowRunner {
    pub fn new(store: WorkflowStore, dispatcher: StepDispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// Load `name` from the store and run it. Store I/O failures are the
    /// only errors that propagate; everything that happens during the
    /// run itself lands in the report.
    pub async fn run(&self, name: &str, ctx: &RunContext) -> Result<RunOutcome> {
        let Some(workflow) = self.store.get(name)? else {
            return Ok(RunOutcome::NotFound { name: name.to_string() });
        };
        Ok(RunOutcome::Finished(self.run_workflow(&workflow, ctx).await))
    }

    /// Execute the steps of an already-loaded workflow in order.
    ///
    /// A handler failure aborts the remaining steps; the report then
    /// carries the failing step's name, the error, and every outcome
    /// collected so far. Skipped steps count as completed-with-caveat,
    /// not failure.
    pub async fn run_workflow(&self, workflow: &Workflow, ctx: &RunContext) -> RunReport {
        let mut results = Vec::with_capacity(workflow.steps.len());

        for step in &workflow.steps {
            info!(workflow = %workflow.name, step = %step.name, kind = %step.step_type, "running step");
            match self.dispatcher.dispatch(step, ctx).await {
                Ok(outcome) => {
                    results.push(StepResult { name: step.name.clone(), outcome });
                }
                Err(e) => {
                    let message = format!("{e:#}");
                    error!(workflow = %workflow.name, step = %step.name, error = %message, "step failed, aborting run");
                    return RunReport {
                        workflow: workflow.name.clone(),
                        success: false,
                        results,
                        error: Some(RunError { step: step.name.clone(), message }),
                    };
                }
            }
        }

        RunReport {
            workflow: workflow.name.clone(),
            success: true,
            results,
            error: None,
        }
    }
}
