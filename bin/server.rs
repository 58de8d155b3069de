// Pokedex - Web Server
// Serves the projected catalog as JSON; the catalog is acquired on startup.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use pokedex::api::{router, AppState};
use pokedex::{AcquisitionService, PokedexConfig, RecordStore};

#[derive(Parser)]
#[command(name = "pokedex-server", version, about = "JSON API over the creature catalog")]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0:3000")]
    addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = PokedexConfig::load(args.config.as_deref())?;

    let state = AppState::new(
        AcquisitionService::from_config(&config),
        RecordStore::new(config.acquisition.overlap),
        &config.api.artwork_base,
    );

    // Initial acquisition runs in the background; /api/status reports progress
    let _initial = state.spawn_refresh();

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    info!(addr = %args.addr, "server listening");
    println!("🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/cards?q=pika", args.addr);
    println!("   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
