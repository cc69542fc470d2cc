//! Test utilities and helpers.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use pico_client::{Client, ClientConfig};
use pico_server::{Engine, Server, ServerConfig};

/// Port counter for test isolation.
static PORT_COUNTER: AtomicU16 = AtomicU16::new(41200);

/// Returns a unique port for each test to avoid conflicts.
pub fn test_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A running test server with a connected client.
pub struct TestServer {
    /// Connected client.
    pub client: Client,
    /// The engine behind the server.
    pub engine: Arc<Engine>,
    /// Handle of the serve task.
    pub server_handle: JoinHandle<()>,
}

impl TestServer {
    /// Shuts everything down.
    pub async fn shutdown(self) {
        let _ = self.client.disconnect().await;
        self.server_handle.abort();
        self.engine.stop().await;
    }
}

/// Starts a server on a fresh port and connects a client to it.
pub async fn start_server_and_connect() -> TestServer {
    let config = ServerConfig::builder()
        .host("127.0.0.1")
        .port(test_port())
        .max_db_requests(10)
        .query_timeout_secs(10)
        .compact_every_secs(3600)
        .build();

    let engine = Arc::new(Engine::start(&config));
    let server = Server::new(Arc::clone(&engine), config.clone());

    let server_handle = tokio::spawn(async move {
        let _ = server.serve().await;
    });

    // Give the listener a moment to bind.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = Client::new(
        ClientConfig::new()
            .host("127.0.0.1")
            .port(config.port)
            .connect_timeout(Duration::from_secs(5)),
    );

    // The accept loop may still be binding on a loaded machine; retry
    // briefly rather than flaking.
    for attempt in 0..10 {
        match client.connect().await {
            Ok(()) => break,
            Err(err) if attempt == 9 => panic!("failed to connect to test server: {err}"),
            Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }

    TestServer {
        client,
        engine,
        server_handle,
    }
}
