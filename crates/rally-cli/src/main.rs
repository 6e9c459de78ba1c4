//! Rally CLI - operator surface over the Rally storage stack
//!
//! Every command opens the local cache, connects to the remote store when
//! `RALLY_REMOTE_URL` and `RALLY_REMOTE_KEY` are set, and mirrors writes
//! through the same coordinator the application uses.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, PlayerCommands, SessionCommands};
use crate::commands::common::{open_coordinator, resolve_storage_config};
use crate::commands::completions::run_completions;
use crate::commands::list::run_list;
use crate::commands::player::run_player_add;
use crate::commands::resync::run_resync;
use crate::commands::session::{run_session_end, run_session_start};
use crate::commands::status::run_status;
use crate::error::CliError;

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
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rally=info")),
        )
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let config = resolve_storage_config(cli.cache_path)?;
    let coordinator = open_coordinator(&config).await?;

    match command {
        Commands::Status { json } => run_status(&coordinator, json).await?,
        Commands::List {
            collection,
            limit,
            json,
        } => run_list(&coordinator, collection, limit, json).await?,
        Commands::Resync { collection } => run_resync(&coordinator, collection).await?,
        Commands::Player {
            command: PlayerCommands::Add { name, email },
        } => run_player_add(&coordinator, &name, email.as_deref()).await?,
        Commands::Session { command } => match command {
            SessionCommands::Start { name, courts } => {
                run_session_start(&coordinator, &name, courts).await?;
            }
            SessionCommands::End { id } => run_session_end(&coordinator, &id).await?,
        },
        Commands::Completions { .. } => {}
    }

    Ok(())
}
