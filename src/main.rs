//! Lead-generation site gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────────┐
//!                              │                    LEAD GATEWAY                      │
//!                              │                                                      │
//!     Browser Request          │  ┌─────────┐    ┌──────────┐    ┌──────────────┐     │
//!     ─────────────────────────┼─▶│  http   │───▶│ security │───▶│   forward    │─────┼──▶ Completion
//!                              │  │ server  │    │ cors +   │    │ chat/contact │     │    provider
//!                              │  └─────────┘    │ limiter  │    └──────┬───────┘     │
//!                              │                 └──────────┘           │             │
//!     Browser Response         │                                        ▼             │
//!     ◀────────────────────────┼──────── fixed envelope / payload ◀─────┴─────────────┼──▶ Email
//!                              │                                                      │    provider
//!                              │  ┌────────────────────────────────────────────────┐  │
//!                              │  │             Cross-Cutting Concerns             │  │
//!                              │  │  ┌────────┐ ┌──────────────┐ ┌──────────────┐  │  │
//!                              │  │  │ config │ │observability │ │  lifecycle   │  │  │
//!                              │  │  └────────┘ └──────────────┘ └──────────────┘  │  │
//!                              │  └────────────────────────────────────────────────┘  │
//!                              └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use lead_gateway::config::{config_from_env, load_config};
use lead_gateway::lifecycle::signals::spawn_signal_handler;
use lead_gateway::observability::{logging::init_logging, metrics::init_metrics};
use lead_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "lead-gateway")]
#[command(about = "API gateway for the lead-generation site", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing .env file is normal in production.
    let dotenv = dotenvy::dotenv().ok();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };

    init_logging(&config.observability);

    tracing::info!("lead-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        chat_limit = config.rate_limit.chat.max_requests,
        contact_limit = config.rate_limit.contact.max_requests,
        allowed_origins = config.cors.allowed_origins.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
