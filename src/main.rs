//! Main entry point for the coldpack CLI

use clap::Parser;
use coldpack::cli::{Cli, Commands};
use coldpack::shutdown::CancelToken;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with optional JSON formatting.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coldpack=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Ctrl+C cancels dispatch; in-flight items finish and progress is saved
    let cancel = CancelToken::shared();
    tokio::spawn({
        let cancel = Arc::clone(&cancel);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, saving progress...");
                cancel.cancel();
            }
        }
    });

    let result = match &cli.command {
        Commands::S3(args) => args.execute(&cli, Arc::clone(&cancel)).await.map(Some),
        Commands::Github(args) => args.execute(&cli, Arc::clone(&cancel)).await.map(Some),
        Commands::Pack(args) => args.execute(&cli, Arc::clone(&cancel)).await.map(Some),
        Commands::Status(args) => args.execute(&cli.checkpoint_dir).map(|()| None),
    };

    match result {
        Ok(Some(summary)) => {
            print!("{summary}");
            if !summary.is_success() {
                std::process::exit(1);
            }
        }
        Ok(None) => {}
        Err(e) => {
            error!("command failed: {e}");
            std::process::exit(1);
        }
    }
}
