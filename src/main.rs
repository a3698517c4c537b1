//! lexchat - terminal client for the legal-assistant chatbot.
//!
//! Handles:
//! - Anonymous usage accounting with a rolling reset window
//! - Login, registration, and token refresh
//! - Interactive and one-shot chat against the backend

mod cli;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use cli::{execute, App, Cli, Commands};
use telemetry::init_tracing_from_env;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing_from_env(cli.verbose);

    info!("Starting lexchat v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(cli.config.as_deref())?;

    // Flags win over files and environment
    if let Some(url) = cli.backend_url {
        config.backend.base_url = url;
    }
    if let Some(path) = cli.state_file {
        config.store.path = Some(path);
    }
    if cli.in_memory {
        config.store.in_memory = true;
    }

    debug!(
        backend = %config.backend.base_url,
        message_limit = config.tracker.message_limit,
        reset_window_hours = config.tracker.reset_window_hours,
        "Loaded config"
    );

    let app = App::build(config)?;
    let command = cli.command.unwrap_or(Commands::Chat { chat: None });

    execute(app, command).await
}
