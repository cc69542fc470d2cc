//! # pico-server
//!
//! Query engine dispatcher and network server for picodb.
//!
//! This crate provides:
//!
//! - **Engine**: the dispatcher that owns the table registry, accepts query
//!   requests on a bounded queue, and executes them on a bounded pool of
//!   concurrent worker tasks.
//!
//! - **Server**: the TCP service speaking the line-delimited JSON protocol
//!   of `pico-proto`, racing the configured timeout against each query's
//!   reply.
//!
//! - **Configuration**: TOML-backed server configuration with defaults and
//!   a builder.
//!
//! # Quick Start
//!
//! ```ignore
//! use pico_server::{Engine, ServerConfig};
//!
//! let config = ServerConfig::default();
//! let engine = Engine::start(&config);
//!
//! let result = engine.execute("CREATE TABLE users (id INT, name TEXT)").await;
//! assert!(result.is_ok());
//!
//! engine.stop().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Server configuration.
pub mod config;

/// The engine dispatcher: bounded queue, worker pool, table registry.
pub mod engine;

/// TCP network service.
pub mod server;

pub use config::ServerConfig;
pub use engine::{Engine, QueryRequest};
pub use server::Server;
