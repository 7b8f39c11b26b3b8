//! `mealbot` -- CLI binary for the canteen ordering chatbot.
//!
//! Provides the following subcommands:
//!
//! - `mealbot serve` -- Start the HTTP server (LINE webhook, login, registration, notifications).
//! - `mealbot check` -- Load and validate configuration without starting anything.

use clap::{Parser, Subcommand};

mod commands;

/// Canteen ordering chatbot for LINE.
#[derive(Parser)]
#[command(name = "mealbot", about = "Canteen ordering chatbot for LINE", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve(commands::serve::ServeArgs),

    /// Validate configuration and print a summary.
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await?,
        Commands::Check(args) => commands::check::run(args)?,
    }

    Ok(())
}
