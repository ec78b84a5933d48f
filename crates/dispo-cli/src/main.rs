//! Dispo CLI - record call dispositions from the terminal
//!
//! Dispositions are saved locally first and delivered to the remote endpoint
//! when it can be reached.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use dispo_core::config::ClientConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::Context;
use crate::commands::completions::run_completions;
use crate::commands::history::run_history;
use crate::commands::list::{run_pending, run_synced};
use crate::commands::remote::run_remote;
use crate::commands::reset::run_reset;
use crate::commands::submit::run_submit;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
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
    init_tracing();

    let cli = Cli::parse();
    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let config = ClientConfig::from_env()?;
    let ctx = Context::new(cli.db_path, config);

    match cli.command {
        Commands::Submit(args) => run_submit(&ctx, args).await?,
        Commands::Pending { json } => run_pending(&ctx, json).await?,
        Commands::Synced { json } => run_synced(&ctx, json).await?,
        Commands::History(args) => run_history(&ctx, args).await?,
        Commands::Sync { offline } => run_sync(&ctx, offline).await?,
        Commands::Watch { interval } => run_watch(&ctx, interval).await?,
        Commands::Remote(args) => run_remote(&ctx, args).await?,
        Commands::Reset { yes } => run_reset(&ctx, yes).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["dispo=info", "dispo_core=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
