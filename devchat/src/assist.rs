//! AI-assisted code review, Q&A, refactoring and documentation.
//!
//! Every feature here is a pure function of its inputs and the injected
//! [`CompletionClient`]; nothing mutates workflow or configuration state.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;

use devchat_sdk::{ChatMessage, CompletionClient, CompletionRequest};

/// Generation parameters shared by all model-backed features,
/// taken from the configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: 2000 }
    }
}

/// Read a source file, reporting a missing path before any network call.
pub fn read_source(path: &Path) -> Result<String> {
    if !path.is_file() {
        bail!("file not found: {}", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub analysis: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Refactoring {
    pub original: String,
    pub refactored: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Documentation {
    pub documentation: String,
    pub file: String,
}

const ASSISTANT_SYSTEM_PROMPT: &str =
    "You are an expert Python developer assisting with code review, refactoring and documentation.";

pub struct CodeAssistant {
    client: Arc<dyn CompletionClient>,
    settings: GenerationSettings,
}

impl CodeAssistant {
    pub fn new(client: Arc<dyn CompletionClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    async fn complete(&self, user_prompt: String) -> Result<String> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(ASSISTANT_SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ])
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens);

        self.client
            .complete(request)
            .await
            .map_err(|e| anyhow!(e).context("completion service request failed"))
    }

    /// Review a file for quality, performance, security and maintainability.
    pub async fn analyze_code(&self, file: &Path) -> Result<Analysis> {
        let code = read_source(file)?;
        let prompt = format!(
            "Analyze the following Python code and provide detailed suggestions for improvement.\n\
             Focus on:\n\
             1. Code quality and best practices\n\
             2. Performance optimizations\n\
             3. Security considerations\n\
             4. Maintainability\n\
             5. Documentation\n\n\
             Code:\n{code}\n\n\
             Provide your analysis in a structured format with specific examples and recommendations."
        );
        let analysis = self.complete(prompt).await?;
        Ok(Analysis { analysis, file: file.display().to_string() })
    }

    /// Answer a free-text coding question.
    pub async fn answer_question(&self, question: &str) -> Result<String> {
        let prompt = format!(
            "Answer the following question with detailed explanations and code examples when appropriate:\n\n\
             Question: {question}\n\n\
             Provide a comprehensive answer that includes:\n\
             1. Clear explanation of the concept\n\
             2. Code examples if applicable\n\
             3. Best practices and common pitfalls\n\
             4. Additional resources for learning more"
        );
        self.complete(prompt).await
    }

    /// Rewrite a file per the given instructions, returning both versions.
    pub async fn refactor_code(&self, file: &Path, instructions: &str) -> Result<Refactoring> {
        let code = read_source(file)?;
        let prompt = format!(
            "Refactor the following Python code according to these instructions:\n\
             {instructions}\n\n\
             Original code:\n{code}\n\n\
             Provide the refactored code with explanations of the changes made.\n\
             Focus on:\n\
             1. Code readability\n\
             2. Performance improvements\n\
             3. Best practices\n\
             4. Maintainability"
        );
        let refactored = self.complete(prompt).await?;
        Ok(Refactoring {
            original: code,
            refactored,
            file: file.display().to_string(),
        })
    }

    /// Produce documentation text for a file.
    pub async fn generate_documentation(&self, file: &Path) -> Result<Documentation> {
        let code = read_source(file)?;
        let prompt = format!(
            "Generate comprehensive documentation for the following Python code:\n\n\
             Code:\n{code}\n\n\
             Include:\n\
             1. Module/package description\n\
             2. Function/class documentation\n\
             3. Usage examples\n\
             4. Parameters and return values\n\
             5. Exceptions and error handling"
        );
        let documentation = self.complete(prompt).await?;
        Ok(Documentation {
            documentation,
            file: file.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_source_reports_missing_file() {
        let err = read_source(Path::new("/nonexistent/missing.py")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
