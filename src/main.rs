//! Vote guard gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                    VOTE GUARD                     │
//!                       │                                                   │
//!   Client Request      │  ┌─────────┐   ┌───────────────────────────────┐  │
//!   ────────────────────┼─▶│  http   │──▶│ guard middleware              │  │
//!                       │  │ server  │   │  routing → security (votes)   │  │
//!                       │  └─────────┘   │          → admin (delegated)  │  │
//!                       │                │          → session (cookie)   │  │
//!                       │                └──────────────┬────────────────┘  │
//!                       │                               │ allowed           │
//!   Client Response     │  ┌─────────┐   ┌──────────────▼────────────────┐  │
//!   ◀───────────────────┼──│ response│◀──│ forward handler (hyper client)│◀─┼── Origin
//!                       │  └─────────┘   └───────────────────────────────┘  │   App
//!                       │                                                   │
//!                       │  config · crypto/token · observability · lifecycle│
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use vote_guard::config::{load_config, load_from_env};
use vote_guard::http::HttpServer;
use vote_guard::lifecycle::{spawn_signal_handler, Shutdown};
use vote_guard::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vote-guard")]
#[command(about = "Session and proxy-detection gateway for vote endpoints", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults plus environment overrides are
    /// used when omitted.
    #[arg(short, long, env = "GUARD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        reputation_credentials = config.reputation.credentials.len(),
        "vote-guard starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(&config)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
