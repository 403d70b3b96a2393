//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gatekeeper::pipeline::AdmissionState;
use gatekeeper::{GatewayConfig, HttpServer, Shutdown};

/// Spawn a gateway on an ephemeral port. Returns the bound address, the
/// live admission state for assertions, and the shutdown handle.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, AdmissionState, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let state = server.state().clone();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, state, shutdown)
}

/// A client that never pools or proxies, for deterministic behavior.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
