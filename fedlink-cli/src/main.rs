//! Fedlink CLI - GitHub Actions to Azure OIDC federation setup tool.

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;

#[derive(Parser)]
#[command(name = "fedlink")]
#[command(author, version, about = "GitHub Actions to Azure OIDC federation setup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the OIDC trust relationship for one repository
    Setup {
        /// Display name for the application registration
        #[arg(long)]
        app_name: String,

        /// Azure subscription id the contributor role is scoped to
        #[arg(long)]
        subscription_id: String,

        /// Resource group the contributor role is scoped to
        #[arg(long)]
        resource_group: String,

        /// GitHub repository in owner/name form
        #[arg(long)]
        repo: String,

        /// Use in-memory mock clients instead of az/gh (dry run)
        #[arg(long)]
        mock: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Setup {
            app_name,
            subscription_id,
            resource_group,
            repo,
            mock,
        } => commands::setup::execute(app_name, subscription_id, resource_group, repo, mock).await,
    };

    if let Err(err) = result {
        let exit = exit_codes::ExitCode::from_anyhow(&err);
        eprintln!("{} {err:#}", "Error:".red().bold());
        std::process::exit(exit.code);
    }
}
