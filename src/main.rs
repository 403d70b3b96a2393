//! Admission gateway binary.
//!
//! Loads configuration, wires the admission services, and serves the
//! pipeline in front of the demo business handlers plus the admin API.

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gatekeeper::config::loader::load_config;
use gatekeeper::config::watcher::ConfigWatcher;
use gatekeeper::config::GatewayConfig;
use gatekeeper::http::HttpServer;
use gatekeeper::lifecycle::Shutdown;
use gatekeeper::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing();

    tracing::info!("gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));

    // Optional config file path as the first argument.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        general_limit = config.rate_limit.general.limit,
        auth_limit = config.rate_limit.auth.limit,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    // Hot reload when a config file is in use. The watcher handle and the
    // fallback sender both have to outlive the server loop.
    let mut _watcher_handle = None;
    let mut _config_tx = None;
    let config_updates = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            _watcher_handle = Some(watcher.run()?);
            updates
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            _config_tx = Some(tx);
            rx
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
