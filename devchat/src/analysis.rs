//! Static analysis of Python source files.
//!
//! Single-pass, line-oriented scanning: metrics and extracted items come
//! from one walk over the source with a handful of compiled patterns.
//! No cross-file or cross-call-site reasoning.

use std::path::Path;

use anyhow::Result;
use regex::Regex;
use serde::Serialize;

use crate::assist::read_source;

/// Complexity threshold above which a split is suggested.
const COMPLEXITY_THRESHOLD: usize = 10;
const FUNCTION_COUNT_THRESHOLD: usize = 20;
const IMPORT_COUNT_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMetrics {
    pub lines_of_code: usize,
    pub functions: usize,
    pub classes: usize,
    pub imports: usize,
    /// 1 + number of branch points (if/elif/for/while/except).
    pub cyclomatic_complexity: usize,
    /// Definition count (functions + classes), a coarse proxy for how
    /// much there is to hold in mind at once.
    pub cognitive_complexity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportInfo {
    pub module: String,
    /// The imported name for `from x import y`; `None` for plain imports.
    pub name: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub bases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub file: String,
    pub metrics: SourceMetrics,
    pub imports: Vec<ImportInfo>,
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub suggestions: Vec<String>,
}

pub struct CodeAnalyzer {
    def_re: Regex,
    class_re: Regex,
    import_re: Regex,
    from_import_re: Regex,
    branch_re: Regex,
}

impl Default for CodeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeAnalyzer {
    pub fn new() -> Self {
        Self {
            def_re: Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(([^)]*)")
                .expect("hard-coded pattern"),
            class_re: Regex::new(r"^\s*class\s+([A-Za-z_]\w*)\s*(?:\(([^)]*)\))?\s*:")
                .expect("hard-coded pattern"),
            import_re: Regex::new(r"^\s*import\s+([\w.]+)(?:\s+as\s+(\w+))?")
                .expect("hard-coded pattern"),
            from_import_re: Regex::new(r"^\s*from\s+([\w.]+)\s+import\s+(.+)")
                .expect("hard-coded pattern"),
            branch_re: Regex::new(r"^\s*(?:if|elif|for|while|except)\b")
                .expect("hard-coded pattern"),
        }
    }

    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisReport> {
        let source = read_source(path)?;
        Ok(self.analyze_source(&source, &path.display().to_string()))
    }

    pub fn analyze_source(&self, source: &str, file: &str) -> AnalysisReport {
        let mut imports = Vec::new();
        let mut functions = Vec::new();
        let mut classes = Vec::new();
        let mut branch_points = 0;

        for line in source.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                continue;
            }

            if let Some(caps) = self.def_re.captures(line) {
                functions.push(FunctionInfo {
                    name: caps[1].to_string(),
                    args: split_arguments(caps.get(2).map_or("", |m| m.as_str())),
                });
            } else if let Some(caps) = self.class_re.captures(line) {
                classes.push(ClassInfo {
                    name: caps[1].to_string(),
                    bases: split_arguments(caps.get(2).map_or("", |m| m.as_str())),
                });
            } else if let Some(caps) = self.from_import_re.captures(line) {
                let module = caps[1].to_string();
                for entry in caps[2].split(',') {
                    let (name, alias) = split_alias(entry);
                    if name.is_empty() {
                        continue;
                    }
                    imports.push(ImportInfo {
                        module: module.clone(),
                        name: Some(name),
                        alias,
                    });
                }
            } else if let Some(caps) = self.import_re.captures(line) {
                imports.push(ImportInfo {
                    module: caps[1].to_string(),
                    name: None,
                    alias: caps.get(2).map(|m| m.as_str().to_string()),
                });
            }

            if self.branch_re.is_match(line) {
                branch_points += 1;
            }
        }

        let metrics = SourceMetrics {
            lines_of_code: source.lines().count(),
            functions: functions.len(),
            classes: classes.len(),
            imports: imports.len(),
            cyclomatic_complexity: 1 + branch_points,
            cognitive_complexity: functions.len() + classes.len(),
        };
        let suggestions = suggestions_for(&metrics);

        AnalysisReport {
            file: file.to_string(),
            metrics,
            imports,
            functions,
            classes,
            suggestions,
        }
    }
}

/// Split a parameter or base-class list, stripping annotations and defaults.
fn split_arguments(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| {
            part.split([':', '='])
                .next()
                .unwrap_or("")
                .trim()
                .to_string()
        })
        .filter(|part| !part.is_empty())
        .collect()
}

/// Split a `name as alias` import entry.
fn split_alias(entry: &str) -> (String, Option<String>) {
    let mut parts = entry.split_whitespace();
    let name = parts.next().unwrap_or("").to_string();
    match (parts.next(), parts.next()) {
        (Some("as"), Some(alias)) => (name, Some(alias.to_string())),
        _ => (name, None),
    }
}

fn suggestions_for(metrics: &SourceMetrics) -> Vec<String> {
    let mut suggestions = Vec::new();
    if metrics.cyclomatic_complexity > COMPLEXITY_THRESHOLD {
        suggestions.push(
            "Consider breaking down complex functions into smaller, more manageable pieces"
                .to_string(),
        );
    }
    if metrics.functions > FUNCTION_COUNT_THRESHOLD {
        suggestions.push("Consider splitting the file into multiple modules".to_string());
    }
    if metrics.imports > IMPORT_COUNT_THRESHOLD {
        suggestions.push("Consider organizing imports and removing unused ones".to_string());
    }
    suggestions
}
