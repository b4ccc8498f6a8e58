//! Command-line interface for strictly_arena.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Arena - tic-tac-toe sessions against automated opponents
#[derive(Parser, Debug)]
#[command(name = "strictly_arena")]
#[command(about = "Play tic-tac-toe against an automated opponent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play an interactive game in the terminal
    Play {
        /// Path to arena configuration file
        #[arg(short, long, default_value = "arena.toml")]
        config: PathBuf,

        /// Your display name
        #[arg(short, long, default_value = "Player")]
        name: String,

        /// Let the automated opponent take the first seat
        #[arg(long)]
        ai_first: bool,
    },

    /// Run automated-vs-automated games and report the results
    Simulate {
        /// Path to arena configuration file
        #[arg(short, long, default_value = "arena.toml")]
        config: PathBuf,

        /// Number of concurrent games
        #[arg(short, long, default_value = "10")]
        games: usize,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}
