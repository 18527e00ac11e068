//! Security scanning: a fixed vulnerability pattern table plus a
//! model-assisted review pass.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::Serialize;

use devchat_sdk::{ChatMessage, CompletionClient, CompletionRequest};

use crate::assist::{read_source, GenerationSettings};

/// Vulnerability categories and the patterns checked for each.
const VULNERABILITY_PATTERNS: &[(&str, &[&str])] = &[
    (
        "sql_injection",
        &[
            r"execute\(.*?\)",
            r"executemany\(.*?\)",
            r"cursor\.execute\(.*?\)",
            r"cursor\.executemany\(.*?\)",
        ],
    ),
    (
        "command_injection",
        &[
            r"os\.system\(.*?\)",
            r"subprocess\.run\(.*?\)",
            r"subprocess\.Popen\(.*?\)",
            r"os\.popen\(.*?\)",
        ],
    ),
    (
        "path_traversal",
        &[r"open\(.*?\)", r"file\(.*?\)", r"Path\(.*?\)"],
    ),
    (
        "hardcoded_secrets",
        &[
            r#"password\s*=\s*['"].*?['"]"#,
            r#"api_key\s*=\s*['"].*?['"]"#,
            r#"secret\s*=\s*['"].*?['"]"#,
            r#"token\s*=\s*['"].*?['"]"#,
        ],
    ),
    (
        "insecure_random",
        &[
            r"random\.randint\(.*?\)",
            r"random\.choice\(.*?\)",
            r"random\.random\(\)",
        ],
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityFinding {
    /// 1-based line number of the match.
    pub line: usize,
    pub snippet: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingGroup {
    pub category: String,
    pub matches: Vec<SecurityFinding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityFindings {
    pub file: String,
    pub static_findings: Vec<FindingGroup>,
    pub model_analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixSuggestions {
    pub findings: SecurityFindings,
    pub fixes: String,
}

struct PatternGroup {
    category: &'static str,
    patterns: Vec<Regex>,
}

pub struct SecurityScanner {
    client: Arc<dyn CompletionClient>,
    settings: GenerationSettings,
    groups: Vec<PatternGroup>,
}

impl SecurityScanner {
    pub fn new(client: Arc<dyn CompletionClient>, settings: GenerationSettings) -> Self {
        let groups = VULNERABILITY_PATTERNS
            .iter()
            .map(|(category, patterns)| PatternGroup {
                category,
                patterns: patterns
                    .iter()
                    .map(|p| Regex::new(p).expect("hard-coded pattern"))
                    .collect(),
            })
            .collect();
        Self { client, settings, groups }
    }

    /// Pattern pass only; no network access.
    pub fn scan_source(&self, source: &str) -> Vec<FindingGroup> {
        let mut findings = Vec::new();
        for group in &self.groups {
            let mut matches = Vec::new();
            for pattern in &group.patterns {
                for m in pattern.find_iter(source) {
                    matches.push(SecurityFinding {
                        line: source[..m.start()].matches('\n').count() + 1,
                        snippet: m.as_str().to_string(),
                        pattern: pattern.as_str().to_string(),
                    });
                }
            }
            if !matches.is_empty() {
                findings.push(FindingGroup {
                    category: group.category.to_string(),
                    matches,
                });
            }
        }
        findings
    }

    async fn model_review(&self, code: &str) -> Result<String> {
        let prompt = format!(
            "Analyze the following Python code for security vulnerabilities:\n\n\
             Code:\n{code}\n\n\
             Look for:\n\
             1. Input validation issues\n\
             2. Authentication and authorization problems\n\
             3. Data protection concerns\n\
             4. API security issues\n\
             5. Cryptography weaknesses\n\
             6. Error handling that might leak sensitive information\n\n\
             Provide a detailed analysis with:\n\
             1. Vulnerability descriptions\n\
             2. Risk levels (High/Medium/Low)\n\
             3. Code locations\n\
             4. Recommended fixes"
        );
        self.request(prompt).await
    }

    async fn request(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("You are a security engineer reviewing Python code."),
            ChatMessage::user(prompt),
        ])
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens);

        self.client
            .complete(request)
            .await
            .map_err(|e| anyhow!(e).context("completion service request failed"))
    }

    /// Run both the pattern pass and the model review over a file.
    pub async fn analyze_file(&self, file: &Path) -> Result<SecurityFindings> {
        let code = read_source(file)?;
        let static_findings = self.scan_source(&code);
        let model_analysis = self.model_review(&code).await?;
        Ok(SecurityFindings {
            file: file.display().to_string(),
            static_findings,
            model_analysis,
        })
    }

    /// Markdown report for a set of findings.
    pub fn render_report(findings: &SecurityFindings) -> String {
        let mut report = String::from("# Security Analysis Report\n");

        if !findings.static_findings.is_empty() {
            report.push_str("\n## Static Analysis Findings\n");
            for group in &findings.static_findings {
                report.push_str(&format!("\n### {}\n", title_case(&group.category)));
                for finding in &group.matches {
                    report.push_str(&format!(
                        "- Line {}: `{}`\n  Pattern: `{}`\n",
                        finding.line, finding.snippet, finding.pattern
                    ));
                }
            }
        }

        if !findings.model_analysis.is_empty() {
            report.push_str("\n## Model-Assisted Analysis\n\n");
            report.push_str(&findings.model_analysis);
            report.push('\n');
        }

        report
    }

    /// Analyze a file, then ask the model for concrete fixes.
    pub async fn suggest_fixes(&self, file: &Path) -> Result<FixSuggestions> {
        let findings = self.analyze_file(file).await?;
        let summary = serde_json::to_string_pretty(&findings.static_findings)
            .unwrap_or_else(|_| "[]".to_string());
        let prompt = format!(
            "Suggest specific fixes for the following security issues:\n\n\
             Findings:\n{summary}\n\n{analysis}\n\n\
             Provide:\n\
             1. Code-level fixes\n\
             2. Architecture-level recommendations\n\
             3. Best practices to implement\n\
             4. Security libraries to use\n\
             5. Testing strategies",
            analysis = findings.model_analysis
        );
        let fixes = self.request(prompt).await?;
        Ok(FixSuggestions { findings, fixes })
    }
}

/// `hardcoded_secrets` -> `Hardcoded Secrets`.
fn title_case(category: &str) -> String {
    category
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use devchat_sdk::{async_trait, CompletionError};

    struct NoopClient;

    #[async_trait]
    impl CompletionClient for NoopClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
            Ok("model analysis".to_string())
        }
    }

    fn scanner() -> SecurityScanner {
        SecurityScanner::new(Arc::new(NoopClient), GenerationSettings::default())
    }

    const VULNERABLE: &str = r#"import os
import random

password = "hunter2"

def run(cmd):
    os.system(cmd)
    return random.random()
"#;

    #[test]
    fn pattern_pass_finds_known_categories() {
        let findings = scanner().scan_source(VULNERABLE);
        let categories: Vec<&str> = findings.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(
            categories,
            vec!["command_injection", "hardcoded_secrets", "insecure_random"]
        );
    }

    #[test]
    fn findings_carry_line_numbers() {
        let findings = scanner().scan_source(VULNERABLE);
        let secrets = findings
            .iter()
            .find(|g| g.category == "hardcoded_secrets")
            .unwrap();
        assert_eq!(secrets.matches[0].line, 4);
        assert!(secrets.matches[0].snippet.contains("hunter2"));
    }

    #[test]
    fn clean_source_yields_no_findings() {
        let findings = scanner().scan_source("x = 1\ny = x + 2\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn report_lists_each_group() {
        let findings = SecurityFindings {
            file: "app.py".to_string(),
            static_findings: scanner().scan_source(VULNERABLE),
            model_analysis: "model analysis".to_string(),
        };
        let report = SecurityScanner::render_report(&findings);
        assert!(report.contains("# Security Analysis Report"));
        assert!(report.contains("### Command Injection"));
        assert!(report.contains("Line 7"));
        assert!(report.contains("model analysis"));
    }
}
