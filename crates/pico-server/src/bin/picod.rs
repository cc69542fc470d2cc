//! picodb server daemon.
//!
//! The `picod` binary starts the query engine and the TCP server, and
//! shuts both down gracefully on ctrl-c or SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (0.0.0.0:8080)
//! picod
//!
//! # Use a configuration file
//! picod --config /etc/picodb/picod.toml
//!
//! # Override the listen port
//! picod --port 9000
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pico_server::{Engine, Server, ServerConfig};

/// picodb server daemon.
#[derive(Parser, Debug)]
#[command(
    name = "picod",
    version,
    about = "picodb database server",
    long_about = "picodb is a minimal in-memory relational data store.\n\n\
                  This daemon starts the query engine and listens for client connections."
)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host address to bind to
    #[arg(short = 'H', long, env = "PICO_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, env = "PICO_PORT")]
    port: Option<u16>,

    /// Data directory (accepted, unused by the in-memory engine)
    #[arg(short = 'd', long, value_name = "DIR", env = "PICO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Maximum outstanding query requests
    #[arg(long, env = "PICO_MAX_DB_REQUESTS")]
    max_db_requests: Option<usize>,

    /// Maximum concurrent client connections
    #[arg(long, env = "PICO_MAX_CONNECTIONS")]
    max_connections: Option<usize>,

    /// Query timeout in seconds
    #[arg(long, env = "PICO_QUERY_TIMEOUT_SECS")]
    query_timeout_secs: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "PICO_LOG_LEVEL")]
    log_level: String,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    run_server(config).await
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_new(format!(
        "pico_server={level},pico_sql={level}",
        level = args.log_level
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = if let Some(path) = &args.config {
        ServerConfig::from_file(path).context("failed to load config file")?
    } else {
        ServerConfig::default()
    };

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(max) = args.max_db_requests {
        config.max_db_requests = max;
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }
    if let Some(secs) = args.query_timeout_secs {
        config.query_timeout_secs = secs;
    }

    Ok(config)
}

async fn run_server(config: ServerConfig) -> Result<()> {
    info!("picodb v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  listen address: {}", config.socket_addr());
    info!("  max connections: {}", config.max_connections);
    info!("  max outstanding requests: {}", config.max_db_requests);
    info!("  query timeout: {}s", config.query_timeout_secs);

    let engine = Arc::new(Engine::start(&config));
    let server = Server::new(Arc::clone(&engine), config);

    tokio::select! {
        result = server.serve() => {
            if let Err(err) = result {
                error!("server error: {err}");
                engine.stop().await;
                return Err(err).context("server terminated");
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down");
    engine.stop().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install ctrl-c handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
