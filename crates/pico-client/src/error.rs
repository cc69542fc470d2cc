//! Client error types.

use thiserror::Error;

/// Errors produced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Not connected; call `connect` first.
    #[error("not connected")]
    NotConnected,

    /// The server closed the connection.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// An operation did not complete within its timeout.
    #[error("operation timed out")]
    Timeout,

    /// Transport-level I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("protocol serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The server answered with something the client did not expect.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
