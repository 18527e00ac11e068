//! Step dispatch: one canonical closed set of step kinds, one handler per
//! kind.
//!
//! Tags from both legacy front ends are accepted as aliases. An unknown
//! tag produces a `skipped` outcome instead of aborting the run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use devchat_sdk::CompletionClient;

use crate::analysis::CodeAnalyzer;
use crate::assist::{CodeAssistant, GenerationSettings};
use crate::security::SecurityScanner;
use crate::testgen::TestGenerator;

use super::WorkflowStep;

/// The closed set of recognized step kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Analyze,
    GenerateTests,
    Refactor,
    Document,
    SecurityScan,
    Ask,
}

impl StepKind {
    /// Resolve a tag, accepting the legacy vocabularies
    /// (`code_analysis`, `test_generation`, `test`, `assist`,
    /// `refactoring`) as aliases of the canonical kinds.
    pub fn from_tag(tag: &str) -> Option<StepKind> {
        match tag {
            "analyze" | "code_analysis" => Some(StepKind::Analyze),
            "generate_tests" | "test_generation" | "test" => Some(StepKind::GenerateTests),
            "refactor" | "refactoring" => Some(StepKind::Refactor),
            "document" => Some(StepKind::Document),
            "security_scan" => Some(StepKind::SecurityScan),
            "ask" | "assist" => Some(StepKind::Ask),
            _ => None,
        }
    }
}

/// Run-time context supplied by the caller, consulted when a step does
/// not carry the matching parameter itself.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub file: Option<PathBuf>,
    pub query: Option<String>,
}

/// The outcome of one dispatched step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Handler-specific result payload.
    Completed(Value),
    /// The step was not executed; the run continues.
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::Skipped { .. })
    }

    pub fn to_value(&self) -> Value {
        match self {
            StepOutcome::Completed(payload) => payload.clone(),
            StepOutcome::Skipped { reason } => json!({
                "status": "skipped",
                "reason": reason,
            }),
        }
    }
}

/// Resolves a step's tag to a handler and invokes it.
///
/// The completion service is injected at construction, never reached
/// for directly, so a deterministic stand-in can take its place in
/// tests. Handlers never mutate workflow state.
pub struct StepDispatcher {
    analyzer: CodeAnalyzer,
    assistant: CodeAssistant,
    testgen: TestGenerator,
    security: SecurityScanner,
}

impl StepDispatcher {
    pub fn new(client: Arc<dyn CompletionClient>, settings: GenerationSettings) -> Self {
        Self {
            analyzer: CodeAnalyzer::new(),
            assistant: CodeAssistant::new(client.clone(), settings),
            testgen: TestGenerator::new(client.clone(), settings),
            security: SecurityScanner::new(client, settings),
        }
    }

    pub async fn dispatch(&self, step: &WorkflowStep, ctx: &RunContext) -> Result<StepOutcome> {
        let Some(kind) = StepKind::from_tag(&step.step_type) else {
            return Ok(StepOutcome::Skipped {
                reason: format!("unknown step type: {}", step.step_type),
            });
        };

        let payload = match kind {
            StepKind::Analyze => {
                let file = self.require_file(step, ctx)?;
                let report = self.analyzer.analyze_file(&file)?;
                serde_json::to_value(report).context("failed to encode analysis report")?
            }
            StepKind::GenerateTests => {
                let file = self.require_file(step, ctx)?;
                let tests = self.testgen.generate_tests(&file, None).await?;
                json!({ "tests": tests, "file": file.display().to_string() })
            }
            StepKind::Refactor => {
                let file = self.require_file(step, ctx)?;
                let instructions = string_param(step, "instructions").with_context(|| {
                    format!("step '{}' requires an 'instructions' parameter", step.name)
                })?;
                let result = self.assistant.refactor_code(&file, &instructions).await?;
                serde_json::to_value(result).context("failed to encode refactoring result")?
            }
            StepKind::Document => {
                let file = self.require_file(step, ctx)?;
                let result = self.assistant.generate_documentation(&file).await?;
                serde_json::to_value(result).context("failed to encode documentation result")?
            }
            StepKind::SecurityScan => {
                let file = self.require_file(step, ctx)?;
                let findings = self.security.analyze_file(&file).await?;
                let report = SecurityScanner::render_report(&findings);
                let mut value =
                    serde_json::to_value(findings).context("failed to encode security findings")?;
                if let Value::Object(map) = &mut value {
                    map.insert("report".to_string(), Value::String(report));
                }
                value
            }
            StepKind::Ask => {
                let query = string_param(step, "query")
                    .or_else(|| ctx.query.clone())
                    .with_context(|| {
                        format!("step '{}' requires a 'query' parameter", step.name)
                    })?;
                let answer = self.assistant.answer_question(&query).await?;
                json!({ "answer": answer, "query": query })
            }
        };

        Ok(StepOutcome::Completed(payload))
    }

    /// `file` from the step's parameters, falling back to the run context.
    fn require_file(&self, step: &WorkflowStep, ctx: &RunContext) -> Result<PathBuf> {
        if let Some(file) = string_param(step, "file") {
            return Ok(PathBuf::from(file));
        }
        if let Some(file) = &ctx.file {
            return Ok(file.clone());
        }
        bail!("step '{}' requires a 'file' parameter", step.name)
    }
}

fn string_param(step: &WorkflowStep, key: &str) -> Option<String> {
    step.parameters
        .get(key)
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}
