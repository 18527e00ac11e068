//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// DevChat - AI-powered coding assistant
#[derive(Parser, Debug)]
#[command(name = "devchat", version, about = "AI-powered coding assistant")]
pub struct Cli {
    /// Override the devchat home directory (config + workflows).
    #[arg(long, global = true, env = "DEVCHAT_HOME")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Workflow management commands
    #[command(subcommand)]
    Workflow(WorkflowCommand),

    /// AI assistance commands
    #[command(subcommand)]
    Assist(AssistCommand),

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Security analysis commands
    #[command(subcommand)]
    Security(SecurityCommand),
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    /// Create a workflow from a definition file
    Create {
        /// Workflow name (also the storage key).
        name: String,

        /// YAML definition file with `description` and `steps`.
        steps_file: PathBuf,

        /// Override the definition's description.
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List available workflows
    List,

    /// Run a workflow
    Run {
        /// Workflow name.
        name: String,

        /// Target file for steps that take one.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Free-text query for `ask` steps without one.
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Replace a workflow's steps from a definition file
    Update {
        /// Workflow name.
        name: String,

        /// YAML definition file with the new steps.
        steps_file: PathBuf,
    },

    /// Remove a workflow
    Remove {
        /// Workflow name.
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AssistCommand {
    /// Analyze Python code for improvements
    Analyze {
        /// Python source file.
        file: PathBuf,
    },

    /// Ask coding questions
    Ask {
        /// The question.
        question: String,
    },

    /// Generate tests for Python code
    GenerateTests {
        /// Python source file.
        file: PathBuf,

        /// Output file path for the generated tests.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Refactor Python code
    Refactor {
        /// Python source file.
        file: PathBuf,

        /// Refactoring instructions.
        instructions: String,
    },

    /// Generate documentation for Python code
    Document {
        /// Python source file.
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Create the config directory and default configuration
    Setup,

    /// Get a configuration value
    Get {
        /// Configuration key.
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key.
        key: String,

        /// New value.
        value: String,
    },

    /// List all configuration
    List,

    /// Reset a configuration value to its default
    Unset {
        /// Configuration key.
        key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SecurityCommand {
    /// Analyze a Python file for security vulnerabilities
    Analyze {
        /// Python source file.
        file: PathBuf,

        /// Output file for the security report.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Suggest fixes for security issues in a file
    SuggestFixes {
        /// Python source file.
        file: PathBuf,
    },
}
