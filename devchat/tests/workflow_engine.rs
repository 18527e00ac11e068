//! End-to-end tests for the workflow engine against a deterministic
//! stub completion service.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tempfile::tempdir;

use devchat::assist::GenerationSettings;
use devchat::workflow::{
    RunContext, RunOutcome, StepDispatcher, StepOutcome, Workflow, WorkflowRunner, WorkflowStep,
    WorkflowStore,
};
use devchat_sdk::{async_trait, CompletionClient, CompletionError, CompletionRequest, Role};

/// Records the user prompt of every call; optionally fails the nth call.
struct StubClient {
    calls: Mutex<Vec<String>>,
    fail_on_call: Option<usize>,
    response: String,
}

impl StubClient {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_on_call: None,
            response: response.to_string(),
        })
    }

    fn failing_on(call: usize, response: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_on_call: Some(call),
            response: response.to_string(),
        })
    }

    fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let user_prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(user_prompt);
            calls.len()
        };

        if self.fail_on_call == Some(call_number) {
            return Err(CompletionError::Network("stub connection reset".to_string()));
        }
        Ok(self.response.clone())
    }
}

fn step(name: &str, step_type: &str, params: &[(&str, &str)]) -> WorkflowStep {
    let parameters: BTreeMap<String, serde_yaml::Value> = params
        .iter()
        .map(|(k, v)| (k.to_string(), serde_yaml::Value::String(v.to_string())))
        .collect();
    WorkflowStep {
        step_type: step_type.to_string(),
        name: name.to_string(),
        description: String::new(),
        parameters,
    }
}

fn workflow(name: &str, steps: Vec<WorkflowStep>) -> Workflow {
    Workflow {
        name: name.to_string(),
        description: format!("test workflow {name}"),
        steps,
        created_at: None,
        updated_at: None,
    }
}

fn runner_with(store: WorkflowStore, client: Arc<StubClient>) -> WorkflowRunner {
    let dispatcher = StepDispatcher::new(client, GenerationSettings::default());
    WorkflowRunner::new(store, dispatcher)
}

#[test]
fn store_round_trips_workflows() {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path()).unwrap();

    let original = workflow(
        "review",
        vec![
            step("s1", "analyze", &[("file", "app.py")]),
            step("s2", "ask", &[("query", "what does this do?")]),
        ],
    );
    store.put(&original).unwrap();

    let loaded = store.get("review").unwrap().expect("workflow should exist");
    assert_eq!(loaded, original);
}

#[test]
fn list_reflects_puts_and_deletes() {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path()).unwrap();

    store.put(&workflow("a", vec![step("s1", "ask", &[("query", "q")])])).unwrap();
    store.put(&workflow("b", vec![step("s1", "ask", &[("query", "q")])])).unwrap();
    assert!(store.delete("a").unwrap());

    assert_eq!(store.list().unwrap(), vec!["b"]);
    assert!(!store.delete("a").unwrap());
}

#[test]
fn get_missing_returns_none() {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path()).unwrap();
    assert_eq!(store.get("missing").unwrap(), None);
}

#[test]
fn put_overwrites_existing_record() {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path()).unwrap();

    let mut wf = workflow("same", vec![step("s1", "ask", &[("query", "first")])]);
    store.put(&wf).unwrap();
    wf.description = "second version".to_string();
    store.put(&wf).unwrap();

    let loaded = store.get("same").unwrap().unwrap();
    assert_eq!(loaded.description, "second version");
    assert_eq!(store.list().unwrap().len(), 1);
}

#[tokio::test]
async fn steps_execute_in_declaration_order() {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path()).unwrap();
    store
        .put(&workflow(
            "ordered",
            vec![
                step("s1", "ask", &[("query", "first question")]),
                step("s2", "ask", &[("query", "second question")]),
                step("s3", "ask", &[("query", "third question")]),
            ],
        ))
        .unwrap();

    let client = StubClient::new("answer");
    let runner = runner_with(store, client.clone());

    let outcome = runner.run("ordered", &RunContext::default()).await.unwrap();
    let report = match outcome {
        RunOutcome::Finished(report) => report,
        RunOutcome::NotFound { name } => panic!("workflow '{name}' should exist"),
    };

    assert!(report.success);
    assert_eq!(report.results.len(), 3);
    assert_eq!(
        report.results.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["s1", "s2", "s3"]
    );

    let calls = client.recorded_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].contains("first question"));
    assert!(calls[1].contains("second question"));
    assert!(calls[2].contains("third question"));
}

#[tokio::test]
async fn unknown_step_type_is_skipped_without_aborting() {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path()).unwrap();
    store
        .put(&workflow(
            "mixed",
            vec![
                step("s1", "deploy", &[]),
                step("s2", "ask", &[("query", "still running?")]),
            ],
        ))
        .unwrap();

    let client = StubClient::new("yes");
    let runner = runner_with(store, client.clone());

    let RunOutcome::Finished(report) = runner.run("mixed", &RunContext::default()).await.unwrap()
    else {
        panic!("workflow should exist");
    };

    assert!(report.success);
    assert_eq!(
        report.outcome("s1"),
        Some(&StepOutcome::Skipped { reason: "unknown step type: deploy".to_string() })
    );
    assert!(matches!(report.outcome("s2"), Some(StepOutcome::Completed(_))));
    assert_eq!(client.recorded_calls().len(), 1);
}

#[tokio::test]
async fn handler_failure_aborts_and_keeps_partial_results() {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path()).unwrap();
    store
        .put(&workflow(
            "fragile",
            vec![
                step("s1", "ask", &[("query", "one")]),
                step("s2", "ask", &[("query", "two")]),
                step("s3", "ask", &[("query", "three")]),
            ],
        ))
        .unwrap();

    let client = StubClient::failing_on(2, "answer");
    let runner = runner_with(store, client.clone());

    let RunOutcome::Finished(report) = runner.run("fragile", &RunContext::default()).await.unwrap()
    else {
        panic!("workflow should exist");
    };

    assert!(!report.success);
    let error = report.error.expect("failed run should carry an error");
    assert_eq!(error.step, "s2");
    assert!(error.message.contains("stub connection reset"));

    // Only the step before the failure produced a result; s3 never ran.
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].name, "s1");
    assert_eq!(client.recorded_calls().len(), 2);
}

#[tokio::test]
async fn document_step_produces_documentation_payload() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("a.py");
    std::fs::write(&source_path, "def greet():\n    return 'hi'\n").unwrap();

    let store = WorkflowStore::open(dir.path().join("workflows")).unwrap();
    store
        .put(&workflow(
            "doc-all",
            vec![step(
                "d1",
                "document",
                &[("file", source_path.to_str().unwrap())],
            )],
        ))
        .unwrap();

    let client = StubClient::new("Module docs: greet returns a greeting.");
    let runner = runner_with(store, client);

    let RunOutcome::Finished(report) = runner.run("doc-all", &RunContext::default()).await.unwrap()
    else {
        panic!("workflow should exist");
    };

    assert!(report.success);
    let Some(StepOutcome::Completed(payload)) = report.outcome("d1") else {
        panic!("d1 should complete");
    };
    let documentation = payload["documentation"].as_str().unwrap();
    assert!(!documentation.is_empty());
    assert_eq!(payload["file"].as_str().unwrap(), source_path.to_str().unwrap());
}

#[tokio::test]
async fn missing_workflow_reports_not_found() {
    let dir = tempdir().unwrap();
    let store = WorkflowStore::open(dir.path()).unwrap();
    let runner = runner_with(store, StubClient::new("unused"));

    match runner.run("missing", &RunContext::default()).await.unwrap() {
        RunOutcome::NotFound { name } => assert_eq!(name, "missing"),
        RunOutcome::Finished(_) => panic!("expected a not-found outcome"),
    }
}

#[tokio::test]
async fn context_file_fills_in_missing_file_parameter() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("target.py");
    std::fs::write(&source_path, "def run():\n    pass\n").unwrap();

    let store = WorkflowStore::open(dir.path().join("workflows")).unwrap();
    store
        .put(&workflow("ctx", vec![step("d1", "document", &[])]))
        .unwrap();

    let runner = runner_with(store, StubClient::new("docs"));
    let ctx = RunContext { file: Some(source_path.clone()), query: None };

    let RunOutcome::Finished(report) = runner.run("ctx", &ctx).await.unwrap() else {
        panic!("workflow should exist");
    };
    assert!(report.success);

    // A missing file with no context fallback fails the step instead.
    let store = WorkflowStore::open(dir.path().join("workflows")).unwrap();
    let runner = runner_with(store, StubClient::new("docs"));
    let RunOutcome::Finished(report) = runner.run("ctx", &RunContext::default()).await.unwrap()
    else {
        panic!("workflow should exist");
    };
    assert!(!report.success);
    assert!(report.error.unwrap().message.contains("requires a 'file' parameter"));
}

#[tokio::test]
async fn scan_refactor_and_testgen_steps_complete() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("tool.py");
    std::fs::write(&source_path, "import os\n\ndef launch(cmd):\n    os.system(cmd)\n").unwrap();
    let file = source_path.to_str().unwrap();

    let store = WorkflowStore::open(dir.path().join("workflows")).unwrap();
    store
        .put(&workflow(
            "harden",
            vec![
                step("scan", "security_scan", &[("file", file)]),
                step(
                    "cleanup",
                    "refactor",
                    &[("file", file), ("instructions", "use subprocess with a list argv")],
                ),
                step("tests", "generate_tests", &[("file", file)]),
            ],
        ))
        .unwrap();

    let client = StubClient::new("def test_launch():\n    assert True");
    let runner = runner_with(store, client.clone());

    let RunOutcome::Finished(report) = runner.run("harden", &RunContext::default()).await.unwrap()
    else {
        panic!("workflow should exist");
    };

    assert!(report.success);

    let Some(StepOutcome::Completed(scan)) = report.outcome("scan") else {
        panic!("scan step should complete");
    };
    assert_eq!(scan["static_findings"][0]["category"], "command_injection");
    assert!(scan["report"].as_str().unwrap().contains("# Security Analysis Report"));

    let Some(StepOutcome::Completed(refactored)) = report.outcome("cleanup") else {
        panic!("refactor step should complete");
    };
    assert!(refactored["original"].as_str().unwrap().contains("os.system"));
    assert!(!refactored["refactored"].as_str().unwrap().is_empty());

    let Some(StepOutcome::Completed(tests)) = report.outcome("tests") else {
        panic!("testgen step should complete");
    };
    assert!(tests["tests"]
        .as_str()
        .unwrap()
        .starts_with("import pytest\nfrom tool import launch"));

    // One completion each: model review, refactoring, one testable object.
    assert_eq!(client.recorded_calls().len(), 3);
}

#[tokio::test]
async fn legacy_step_tags_still_dispatch() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("legacy.py");
    std::fs::write(&source_path, "import os\n\ndef main():\n    if os.name:\n        pass\n")
        .unwrap();

    let store = WorkflowStore::open(dir.path().join("workflows")).unwrap();
    store
        .put(&workflow(
            "legacy",
            vec![
                step("metrics", "code_analysis", &[("file", source_path.to_str().unwrap())]),
                step("question", "assist", &[("query", "explain main")]),
            ],
        ))
        .unwrap();

    let client = StubClient::new("explanation");
    let runner = runner_with(store, client);

    let RunOutcome::Finished(report) = runner.run("legacy", &RunContext::default()).await.unwrap()
    else {
        panic!("workflow should exist");
    };

    assert!(report.success);
    let Some(StepOutcome::Completed(metrics)) = report.outcome("metrics") else {
        panic!("metrics step should complete");
    };
    assert_eq!(metrics["metrics"]["functions"], 1);
    assert_eq!(metrics["metrics"]["imports"], 1);
    assert!(matches!(report.outcome("question"), Some(StepOutcome::Completed(_))));
}
