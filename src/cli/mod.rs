// src/cli/mod.rs — Command-line interface

pub mod init;
pub mod run;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "postwright", version, about = "AI drafting companion for LinkedIn posts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a config file (defaults to ~/.postwright/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the bot (default)
    Run,
    /// Write a starter config.toml
    Init,
    /// Show configuration and storage status
    Status {
        /// Also list this user's stored drafts, newest first
        #[arg(long)]
        user: Option<i64>,
    },
}
