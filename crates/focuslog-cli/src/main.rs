//! focuslog CLI - local-first focus tracking from the terminal
//!
//! Every command works against the local database; `sync now` pushes and
//! pulls against the remote service when one is configured.

mod cli;
mod commands;
mod error;

use std::path::PathBuf;

use clap::Parser;

use cli::{Cli, Commands, ProjectCommands, SyncCommands, TaskCommands};
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("focuslog=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Project { command } => match command {
            ProjectCommands::Add { name } => commands::project::run_add(&name, &db_path).await?,
            ProjectCommands::List { json } => commands::project::run_list(json, &db_path).await?,
        },
        Commands::Task { command } => match command {
            TaskCommands::Add {
                title,
                project,
                estimate,
                priority,
                due,
            } => {
                commands::task::run_add(&title, project, estimate, priority, due.as_deref(), &db_path)
                    .await?;
            }
            TaskCommands::List { project, json } => {
                commands::task::run_list(project, json, &db_path).await?;
            }
            TaskCommands::Done { id } => commands::task::run_done(id, &db_path).await?,
        },
        Commands::Sync { command } => match command {
            SyncCommands::Now => commands::sync::run_now(&db_path).await?,
            SyncCommands::Status => commands::sync::run_status(&db_path).await?,
        },
    }

    Ok(())
}

fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("focuslog")
            .join("focuslog.db")
    })
}
