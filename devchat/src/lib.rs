// Static code analysis (metrics, imports, functions, classes)
pub mod analysis;

// AI-assisted code review, Q&A, refactoring and documentation
pub mod assist;

// CLI argument definitions
pub mod cli;

// CLI command handlers
pub mod commands;

// Typed configuration with a closed key set
pub mod config;

// Console rendering (tables, panels, styled errors)
pub mod output;

// Pattern-based and model-assisted security scanning
pub mod security;

// Test generation
pub mod testgen;

// Workflow records, store, dispatcher and run coordinator
pub mod workflow;
