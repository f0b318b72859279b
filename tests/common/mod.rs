//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use hit_router::config::ServerConfig;
use hit_router::{HitRouter, HttpServer, Shutdown};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral loopback port.
pub async fn start_server(config: ServerConfig, router: HitRouter) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, router);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

/// Client that never pools or follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
