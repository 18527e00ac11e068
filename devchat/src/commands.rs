//! Command handlers: each CLI subcommand maps onto one core operation
//! plus output formatting.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use console::style;

use devchat_sdk::{CompletionClient, OpenAiClient};

use crate::assist::CodeAssistant;
use crate::cli::{AssistCommand, ConfigCommand, SecurityCommand, WorkflowCommand};
use crate::config::{ConfigKey, ConfigManager};
use crate::output;
use crate::security::SecurityScanner;
use crate::testgen::TestGenerator;
use crate::workflow::{
    RunContext, RunOutcome, StepDispatcher, Workflow, WorkflowRunner, WorkflowStore,
};

/// Locations owned by the application, rooted at one home directory.
pub struct AppPaths {
    home: PathBuf,
}

impl AppPaths {
    /// Use the given home directory, or default to `~/.devchat`.
    pub fn resolve(home: Option<PathBuf>) -> Result<Self> {
        let home = match home {
            Some(home) => home,
            None => dirs::home_dir()
                .context("could not determine the home directory")?
                .join(".devchat"),
        };
        Ok(Self { home })
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join(crate::config::CONFIG_FILE_NAME)
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.home.join("workflows")
    }
}

/// Build the completion client from configuration.
fn build_client(manager: &ConfigManager) -> Result<Arc<dyn CompletionClient>> {
    let api_key = manager.resolved_api_key().context(
        "no API key configured; run `devchat config set api_key <key>` or set OPENAI_API_KEY",
    )?;
    let client = match &manager.config.api_base {
        Some(base) => {
            let url = format!("{}/chat/completions", base.trim_end_matches('/'));
            OpenAiClient::with_url(api_key, url)
        }
        None => OpenAiClient::new(api_key),
    };
    Ok(Arc::new(client.with_model(&manager.config.model)))
}

fn load_definition(steps_file: &PathBuf) -> Result<crate::workflow::WorkflowDefinition> {
    if !steps_file.is_file() {
        bail!("steps file not found: {}", steps_file.display());
    }
    let raw = fs::read_to_string(steps_file)
        .with_context(|| format!("failed to read steps file {}", steps_file.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("malformed workflow definition {}", steps_file.display()))
}

pub async fn handle_workflow(
    cmd: WorkflowCommand,
    paths: &AppPaths,
    manager: &ConfigManager,
) -> Result<()> {
    let store = WorkflowStore::open(paths.workflows_dir())?;

    match cmd {
        WorkflowCommand::Create { name, steps_file, description } => {
            let mut definition = load_definition(&steps_file)?;
            if let Some(description) = description {
                definition.description = description;
            }
            let workflow = Workflow::from_definition(&name, definition);
            store.put(&workflow)?;
            println!("{}", style(format!("Workflow '{name}' created successfully")).green());
        }

        WorkflowCommand::List => {
            let names = store.list()?;
            if names.is_empty() {
                println!("No workflows found");
                return Ok(());
            }
            let mut rows = Vec::with_capacity(names.len());
            for name in names {
                if let Some(workflow) = store.get(&name)? {
                    rows.push((name, workflow.description, workflow.steps.len()));
                }
            }
            output::print_workflow_table(&rows);
        }

        WorkflowCommand::Run { name, file, query } => {
            let client = build_client(manager)?;
            let dispatcher = StepDispatcher::new(client, manager.generation());
            let runner = WorkflowRunner::new(store, dispatcher);
            let ctx = RunContext { file, query };

            match runner.run(&name, &ctx).await? {
                RunOutcome::NotFound { name } => bail!("workflow '{name}' not found"),
                RunOutcome::Finished(report) => {
                    output::print_run_report(&report);
                    if !report.success {
                        bail!("workflow '{name}' did not complete");
                    }
                }
            }
        }

        WorkflowCommand::Update { name, steps_file } => {
            let Some(mut workflow) = store.get(&name)? else {
                bail!("workflow '{name}' not found");
            };
            let definition = load_definition(&steps_file)?;
            workflow.replace_steps(definition);
            store.put(&workflow)?;
            println!("{}", style(format!("Workflow '{name}' updated")).green());
        }

        WorkflowCommand::Remove { name } => {
            if !store.delete(&name)? {
                bail!("workflow '{name}' not found");
            }
            println!("{}", style(format!("Workflow '{name}' removed")).green());
        }
    }

    Ok(())
}

pub async fn handle_assist(cmd: AssistCommand, manager: &ConfigManager) -> Result<()> {
    let client = build_client(manager)?;
    let settings = manager.generation();

    match cmd {
        AssistCommand::Analyze { file } => {
            let assistant = CodeAssistant::new(client, settings);
            let result = assistant.analyze_code(&file).await?;
            output::print_panel(&format!("Code Analysis for {}", file.display()), &result.analysis);
        }

        AssistCommand::Ask { question } => {
            let assistant = CodeAssistant::new(client, settings);
            let answer = assistant.answer_question(&question).await?;
            output::print_panel("Answer", &answer);
        }

        AssistCommand::GenerateTests { file, output: output_path } => {
            let generator = TestGenerator::new(client, settings);
            let tests = generator.generate_tests(&file, output_path.as_deref()).await?;
            match &output_path {
                Some(path) => println!(
                    "{}",
                    style(format!("Tests generated successfully at {}", path.display())).green()
                ),
                None => output::print_panel(
                    &format!("Generated Tests for {}", file.display()),
                    &tests,
                ),
            }

            let coverage = generator.generate_coverage_report(&file, &tests).await?;
            output::print_panel("Coverage Report", &coverage.report);
        }

        AssistCommand::Refactor { file, instructions } => {
            let assistant = CodeAssistant::new(client, settings);
            let result = assistant.refactor_code(&file, &instructions).await?;
            output::print_panel(
                &format!("Refactored Code for {}", file.display()),
                &result.refactored,
            );
        }

        AssistCommand::Document { file } => {
            let assistant = CodeAssistant::new(client, settings);
            let result = assistant.generate_documentation(&file).await?;
            output::print_panel(
                &format!("Documentation for {}", file.display()),
                &result.documentation,
            );
        }
    }

    Ok(())
}

pub fn handle_config(cmd: ConfigCommand, manager: &mut ConfigManager) -> Result<()> {
    match cmd {
        ConfigCommand::Setup => {
            manager.setup()?;
            println!(
                "{}",
                style(format!("Configuration ready at {}", manager.path().display())).green()
            );
        }

        ConfigCommand::Get { key } => {
            let key: ConfigKey = key.parse()?;
            match manager.get(key) {
                Some(value) => println!("{key}: {value}"),
                None => println!("{}", style(format!("'{key}' is not set")).yellow()),
            }
        }

        ConfigCommand::Set { key, value } => {
            let key: ConfigKey = key.parse()?;
            manager.set(key, &value)?;
            println!("{}", style(format!("Configuration '{key}' set")).green());
        }

        ConfigCommand::List => {
            output::print_config_table(&manager.entries());
        }

        ConfigCommand::Unset { key } => {
            let key: ConfigKey = key.parse()?;
            manager.unset(key)?;
            println!("{}", style(format!("Configuration '{key}' reset to default")).green());
        }
    }

    Ok(())
}

pub async fn handle_security(cmd: SecurityCommand, manager: &ConfigManager) -> Result<()> {
    let client = build_client(manager)?;
    let scanner = SecurityScanner::new(client, manager.generation());

    match cmd {
        SecurityCommand::Analyze { file, output: output_path } => {
            let findings = scanner.analyze_file(&file).await?;
            let report = SecurityScanner::render_report(&findings);
            match output_path {
                Some(path) => {
                    fs::write(&path, report)
                        .with_context(|| format!("failed to write report to {}", path.display()))?;
                    println!(
                        "{}",
                        style(format!("Security report saved to {}", path.display())).green()
                    );
                }
                None => println!("{report}"),
            }
        }

        SecurityCommand::SuggestFixes { file } => {
            let result = scanner.suggest_fixes(&file).await?;
            println!("{}", SecurityScanner::render_report(&result.findings));
            output::print_panel("Suggested Fixes", &result.fixes);
        }
    }

    Ok(())
}
