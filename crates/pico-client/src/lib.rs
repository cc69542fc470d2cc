//! # pico-client
//!
//! Client library for picodb.
//!
//! Connects to a picodb server over TCP and speaks the line-delimited JSON
//! protocol of `pico-proto`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pico_client::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::new().host("127.0.0.1").port(8080));
//!     client.connect().await?;
//!
//!     client.execute("CREATE TABLE users (id INT, name TEXT)").await?;
//!     client.execute("INSERT INTO users (id, name) VALUES (1, 'alice')").await?;
//!
//!     let result = client.execute("SELECT * FROM users").await?;
//!     println!("{} rows", result.rows.len());
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

/// Client connection.
pub mod client;

pub use client::{Client, ClientConfig, ServerInfo};
pub use error::{ClientError, ClientResult};

// Re-export the wire types callers interact with.
pub use pico_proto::{QueryResponse, Row, Status};
