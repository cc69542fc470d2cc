//! TCP network service.
//!
//! The server accepts connections on the configured address, bounded by a
//! connection semaphore, and speaks the line-delimited JSON protocol of
//! `pico-proto`: one request object per line in, one response object per
//! line out. Query requests race the configured timeout against the
//! engine's reply; when the timer wins, the caller gets a `query timeout`
//! result and the worker's eventual reply is dropped harmlessly.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use pico_proto::{QueryResponse, Request, Response, Status, PROTOCOL_VERSION};

use crate::config::ServerConfig;
use crate::engine::Engine;

/// The picodb TCP server.
pub struct Server {
    engine: Arc<Engine>,
    config: ServerConfig,
}

impl Server {
    /// Creates a server over a running engine.
    pub fn new(engine: Arc<Engine>, config: ServerConfig) -> Self {
        Self { engine, config }
    }

    /// Runs the accept loop until the task is cancelled or the listener
    /// fails.
    pub async fn serve(&self) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        info!("listening on {}", listener.local_addr()?);

        let connections = Arc::new(Semaphore::new(self.config.max_connections));
        let query_timeout = Duration::from_secs(self.config.query_timeout_secs);

        loop {
            // Admission first: hold accepting once the connection budget is
            // spent, until a connection closes and returns its permit.
            let Ok(permit) = Arc::clone(&connections).acquire_owned().await else {
                return Ok(());
            };
            let (stream, peer) = listener.accept().await?;
            debug!(%peer, "accepted connection");

            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(err) = handle_connection(stream, &engine, query_timeout).await {
                    debug!(%peer, %err, "connection closed with error");
                }
                debug!(%peer, "connection closed");
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    engine: &Engine,
    query_timeout: Duration,
) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(engine, request, query_timeout).await,
            Err(err) => Response::Error {
                message: format!("malformed request: {err}"),
            },
        };

        let mut frame = serde_json::to_vec(&response)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        frame.push(b'\n');
        write_half.write_all(&frame).await?;
    }
    Ok(())
}

async fn handle_request(engine: &Engine, request: Request, query_timeout: Duration) -> Response {
    match request {
        Request::Query { sql } => {
            info!(%sql, "received query");
            let reply = engine.submit(sql).await;
            let result = match timeout(query_timeout, reply).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => {
                    QueryResponse::failure(Status::Unexpected, "engine reply channel closed")
                }
                Err(_) => {
                    warn!("query timed out after {}s", query_timeout.as_secs());
                    QueryResponse::failure(Status::Timeout, "query timed out")
                }
            };
            Response::Query { result }
        }
        Request::Ping => Response::Pong,
        Request::ServerInfo => Response::ServerInfo {
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION,
        },
    }
}
