//! Pytest test generation for Python source files.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::Serialize;

use devchat_sdk::{ChatMessage, CompletionClient, CompletionRequest};

use crate::assist::{read_source, GenerationSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Function,
    Class,
}

/// A public function or class worth generating tests for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestableObject {
    pub name: String,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub report: String,
    pub file: String,
}

pub struct TestGenerator {
    client: Arc<dyn CompletionClient>,
    settings: GenerationSettings,
    def_re: Regex,
    class_re: Regex,
}

impl TestGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, settings: GenerationSettings) -> Self {
        Self {
            client,
            settings,
            def_re: Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("hard-coded pattern"),
            class_re: Regex::new(r"^\s*class\s+([A-Za-z_]\w*)").expect("hard-coded pattern"),
        }
    }

    /// Public `def`/`class` definitions, in source order, deduplicated.
    pub fn find_testable_objects(&self, source: &str) -> Vec<TestableObject> {
        let mut objects: Vec<TestableObject> = Vec::new();
        for line in source.lines() {
            let object = if let Some(caps) = self.def_re.captures(line) {
                Some(TestableObject { name: caps[1].to_string(), kind: ObjectKind::Function })
            } else if let Some(caps) = self.class_re.captures(line) {
                Some(TestableObject { name: caps[1].to_string(), kind: ObjectKind::Class })
            } else {
                None
            };

            if let Some(object) = object {
                if object.name.starts_with('_') {
                    continue;
                }
                if !objects.iter().any(|o| o.name == object.name) {
                    objects.push(object);
                }
            }
        }
        objects
    }

    /// Generate a pytest file for `file`, optionally writing it to `output`.
    pub async fn generate_tests(&self, file: &Path, output: Option<&Path>) -> Result<String> {
        let source = read_source(file)?;
        let module = file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context("source path has no file stem")?;

        let objects = self.find_testable_objects(&source);
        if objects.is_empty() {
            bail!(
                "no public functions or classes to test in {}",
                file.display()
            );
        }

        let mut cases = Vec::new();
        for object in &objects {
            cases.push(self.generate_case(object, &source).await?);
        }

        let test_file = render_test_file(module, &objects, &cases);

        if let Some(output) = output {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory {}", parent.display())
                })?;
            }
            fs::write(output, &test_file)
                .with_context(|| format!("failed to write test file {}", output.display()))?;
        }

        Ok(test_file)
    }

    async fn generate_case(&self, object: &TestableObject, source: &str) -> Result<String> {
        let prompt = match object.kind {
            ObjectKind::Function => format!(
                "Generate comprehensive test cases for the following Python function:\n\n\
                 Function: {name}\n\
                 Code:\n{source}\n\n\
                 Include:\n\
                 1. Test cases for normal operation\n\
                 2. Edge cases and error conditions\n\
                 3. Input validation\n\
                 4. Expected outputs\n\
                 5. Mocking if needed\n\n\
                 Return the test cases in pytest format with detailed comments.",
                name = object.name
            ),
            ObjectKind::Class => format!(
                "Generate comprehensive test cases for the following Python class:\n\n\
                 Class: {name}\n\
                 Code:\n{source}\n\n\
                 Include:\n\
                 1. Test cases for initialization\n\
                 2. Test cases for all public methods\n\
                 3. Edge cases and error conditions\n\
                 4. Property testing\n\
                 5. Mocking if needed\n\n\
                 Return the test cases in pytest format with detailed comments.",
                name = object.name
            ),
        };
        self.request(prompt).await
    }

    /// Model-produced coverage narrative for a source file and its tests.
    pub async fn generate_coverage_report(
        &self,
        file: &Path,
        test_source: &str,
    ) -> Result<CoverageReport> {
        let code = read_source(file)?;
        let prompt = format!(
            "Analyze the following Python code and its test file to generate a coverage report:\n\n\
             Original code:\n{code}\n\n\
             Test file:\n{test_source}\n\n\
             Provide a detailed coverage report including:\n\
             1. Lines covered\n\
             2. Lines not covered\n\
             3. Branch coverage\n\
             4. Suggestions for additional test cases\n\
             5. Potential edge cases not covered"
        );
        let report = self.request(prompt).await?;
        Ok(CoverageReport {
            report,
            file: file.display().to_string(),
        })
    }

    async fn request(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("You are an expert in writing pytest unit tests."),
            ChatMessage::user(prompt),
        ])
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens);

        self.client
            .complete(request)
            .await
            .map_err(|e| anyhow!(e).context("completion service request failed"))
    }
}

/// Assemble the final pytest file from generated cases.
fn render_test_file(module: &str, objects: &[TestableObject], cases: &[String]) -> String {
    let imports = objects
        .iter()
        .map(|o| o.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "import pytest\nfrom {module} import {imports}\n\n{cases}\n",
        cases = cases.join("\n\n")
    )
}
