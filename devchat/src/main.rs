use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use devchat::cli::{Cli, Commands};
use devchat::commands::{self, AppPaths};
use devchat::config::ConfigManager;
use devchat::output;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devchat=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        output::print_error(&error);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::resolve(cli.home)?;
    let mut manager = ConfigManager::load(paths.config_file())?;

    match cli.command {
        Commands::Workflow(cmd) => commands::handle_workflow(cmd, &paths, &manager).await,
        Commands::Assist(cmd) => commands::handle_assist(cmd, &manager).await,
        Commands::Config(cmd) => commands::handle_config(cmd, &mut manager),
        Commands::Security(cmd) => commands::handle_security(cmd, &manager).await,
    }
}
