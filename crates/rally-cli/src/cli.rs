use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rally_core::CollectionKind;

#[derive(Parser)]
#[command(name = "rally")]
#[command(about = "Inspect and mirror Rally session data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to the local cache file
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show remote client health and collection sizes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List entries of one collection
    List {
        /// Collection key, e.g. players or session_settings
        #[arg(value_parser = parse_collection)]
        collection: CollectionKind,
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-read the remote and push local changes
    Resync {
        /// Only this collection (all when omitted)
        #[arg(value_parser = parse_collection)]
        collection: Option<CollectionKind>,
    },
    /// Manage players
    Player {
        #[command(subcommand)]
        command: PlayerCommands,
    },
    /// Start or end play sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum PlayerCommands {
    /// Register a new player
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Open a new session
    Start {
        #[arg(long)]
        name: String,
        /// Number of courts in play
        #[arg(long, default_value = "1")]
        courts: u32,
    },
    /// Close an open session
    End {
        /// Session ID
        id: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn parse_collection(value: &str) -> Result<CollectionKind, String> {
    value.parse().map_err(|_| {
        let known = CollectionKind::ALL
            .iter()
            .map(|kind| kind.key())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown collection '{value}' (expected one of: {known})")
    })
}
