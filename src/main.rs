//! loadgate: round-robin reverse proxy with per-client rate limiting.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                   LOADGATE                     │
//!                      │                                                │
//!   Client Request     │  ┌─────────┐   ┌──────────────┐   ┌─────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ rate limiter │──▶│balancer │  │
//!                      │  │ server  │   │ (per client) │   │  (RR)   │  │
//!                      │  └─────────┘   └──────┬───────┘   └────┬────┘  │
//!                      │       ▲           429 │                │       │
//!                      │       │               ▼                ▼       │
//!   Client Response    │  ┌─────────┐                      ┌─────────┐  │
//!   ◀──────────────────┼──│response │◀─────────────────────│ http    │◀─┼── Backend
//!                      │  └─────────┘                      │ client  │  │
//!                      │                                   └─────────┘  │
//!                      │  Background: health sweep, bucket refills      │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;

use loadgate::config::{ProxyConfig, load_config};
use loadgate::lifecycle::{App, signals};
use loadgate::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "loadgate", version, about = "Round-robin load balancer with per-client rate limiting")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        eprintln!("config file {} not found, using defaults", args.config.display());
        ProxyConfig::default()
    };

    logging::init(&config.observability.log_level);

    tracing::info!("loadgate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        "Configuration loaded"
    );

    let app = App::bootstrap(config.clone()).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = app.shutdown_handle();
    tokio::spawn(async move {
        signals::wait_for_shutdown().await;
        shutdown.trigger();
    });

    app.serve(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
