//! Client connection management.
//!
//! Provides the main `Client` struct for connecting to picodb and executing
//! queries. The connection is a single TCP stream guarded by an async
//! mutex, so one request/response exchange completes before the next
//! starts.

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;

use pico_proto::{QueryResponse, Request, Response};

use crate::error::{ClientError, ClientResult};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout, covering the full round trip.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Creates a new client configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the `host:port` connection string.
    pub fn connection_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Server identification returned by [`Client::server_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server semantic version.
    pub server_version: String,
    /// Wire protocol version.
    pub protocol_version: u32,
}

/// A picodb client over one TCP connection.
pub struct Client {
    config: ClientConfig,
    connection: AsyncMutex<Option<BufStream<TcpStream>>>,
}

impl Client {
    /// Creates a client; does not connect yet.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: AsyncMutex::new(None),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Establishes the TCP connection.
    pub async fn connect(&self) -> ClientResult<()> {
        let addr = self.config.connection_string();
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| ClientError::Timeout)??;
        *self.connection.lock().await = Some(BufStream::new(stream));
        Ok(())
    }

    /// Closes the connection. Safe to call when not connected.
    pub async fn disconnect(&self) -> ClientResult<()> {
        if let Some(mut stream) = self.connection.lock().await.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    /// Returns true if the client currently holds a connection.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Executes one SQL statement and returns the server's result.
    pub async fn execute(&self, sql: impl Into<String>) -> ClientResult<QueryResponse> {
        let request = Request::Query { sql: sql.into() };
        match self.roundtrip(&request).await? {
            Response::Query { result } => Ok(result),
            Response::Error { message } => Err(ClientError::Protocol(message)),
            other => Err(ClientError::Protocol(format!(
                "unexpected response to query: {other:?}"
            ))),
        }
    }

    /// Pings the server, returning the round-trip latency.
    pub async fn ping(&self) -> ClientResult<Duration> {
        let started = Instant::now();
        match self.roundtrip(&Request::Ping).await? {
            Response::Pong => Ok(started.elapsed()),
            other => Err(ClientError::Protocol(format!(
                "unexpected response to ping: {other:?}"
            ))),
        }
    }

    /// Asks the server for its version information.
    pub async fn server_info(&self) -> ClientResult<ServerInfo> {
        match self.roundtrip(&Request::ServerInfo).await? {
            Response::ServerInfo {
                server_version,
                protocol_version,
            } => Ok(ServerInfo {
                server_version,
                protocol_version,
            }),
            other => Err(ClientError::Protocol(format!(
                "unexpected response to server_info: {other:?}"
            ))),
        }
    }

    /// Sends one request frame and reads one response frame.
    async fn roundtrip(&self, request: &Request) -> ClientResult<Response> {
        let mut guard = self.connection.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let mut frame = serde_json::to_vec(request)?;
        frame.push(b'\n');
        stream.write_all(&frame).await?;
        stream.flush().await?;

        let mut line = String::new();
        let read = timeout(self.config.request_timeout, stream.read_line(&mut line))
            .await
            .map_err(|_| ClientError::Timeout)??;
        if read == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(serde_json::from_str(&line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new()
            .host("db.internal")
            .port(9000)
            .connect_timeout(Duration::from_secs(2))
            .request_timeout(Duration::from_secs(5));

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 9000);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.connection_string(), "db.internal:9000");
    }

    #[tokio::test]
    async fn test_execute_without_connect_fails() {
        let client = Client::new(ClientConfig::default());
        assert!(matches!(
            client.execute("SELECT 1").await,
            Err(ClientError::NotConnected)
        ));
        assert!(!client.is_connected().await);
    }
}
