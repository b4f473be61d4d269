//! request-gate
//!
//! Authenticating front door for a document-store server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ timeout ─▶ gate middleware ─▶ downstream
//!                                                          │
//!                                  ConnectionContext ◀─────┤ path, method, Accept,
//!                                                          │ client address, body cache
//!                                                          ▼
//!                                                    Authenticator
//!                                                 ┌───────┴────────┐
//!                                           UserDirectory       Blocker
//!                                          (credentials)   (login delays)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use request_gate::config::{self, GateConfig};
use request_gate::lifecycle::{signals, startup, Shutdown};
use request_gate::observability::{logging, metrics};
use request_gate::GateServer;

#[derive(Parser)]
#[command(name = "request-gate")]
#[command(about = "Authenticating front door for a document-store server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GateConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("request-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        method = %config.auth.method,
        users = config.users.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
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

    let authenticator = startup::build_authenticator(&config);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let stopped = shutdown.subscribe();
    signals::forward_to(shutdown.clone());

    let server = GateServer::new(config, authenticator.clone());
    let result = server.run(listener, stopped).await;

    authenticator.close();
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}
