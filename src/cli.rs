//! Command-line interface for strictly_mancala.

use clap::{Parser, Subcommand};

/// Strictly Mancala - multiplayer Kalah server over WebSocket
#[derive(Parser, Debug)]
#[command(name = "strictly_mancala")]
#[command(about = "Multiplayer Kalah game server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file (created if it doesn't exist)
        #[arg(long)]
        db_path: Option<String>,

        /// Optional TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,
    },

    /// Apply pending database migrations and exit
    Migrate {
        /// Path to the database file
        #[arg(long)]
        db_path: Option<String>,

        /// Optional TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,
    },
}
