//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use service_scaffold::config::ServiceConfig;
use service_scaffold::http::server::ServerError;
use service_scaffold::lifecycle::Shutdown;
use service_scaffold::security::Clock;
use service_scaffold::HttpServer;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
    }
}

/// Config bound to localhost with the given limits. Proxy headers are
/// not trusted so the socket peer is the client.
#[allow(dead_code)]
pub fn test_config(window_ms: u64, max_requests: u32) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.trust_proxy_hops = 0;
    config.security.window_ms = window_ms;
    config.security.max_requests = max_requests;
    config
}

/// Start the full service on `127.0.0.1:0`.
#[allow(dead_code)]
pub async fn spawn_server(config: ServiceConfig) -> TestServer {
    start(HttpServer::new(config)).await
}

/// Start the full service with the rate limiter on `clock`.
#[allow(dead_code)]
pub async fn spawn_server_with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> TestServer {
    start(HttpServer::with_clock(config, clock)).await
}

async fn start(server: HttpServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));
    TestServer {
        addr,
        shutdown,
        handle,
    }
}
