// src/main.rs — Postwright entry point

use clap::Parser;

use postwright::cli::{Cli, Commands};
use postwright::infra::config::Config;
use postwright::infra::logger;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("info");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Some(Commands::Init) => postwright::cli::init::run_init(),
        Some(Commands::Status { user }) => postwright::cli::status::show_status(&config, user),
        Some(Commands::Run) | None => postwright::cli::run::run(config).await,
    }
}
