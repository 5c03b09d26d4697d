//! access-logger demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ trace ─▶ request-id ─▶ access log ─▶ timeout ─▶ handler
//!                                               │
//!                                               ├─ rules    (forced DEBUG)
//!                                               ├─ body     (bounded capture)
//!                                               ├─ record   (build, flatten)
//!                                               ├─ adapters (mutate)
//!                                               └─ emitter  (tracing event)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use access_logger::config::{load_config, AppConfig};
use access_logger::observability::logging::init_logging;
use access_logger::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "access-logger")]
#[command(about = "Demo HTTP server with structured access logging", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    init_logging(&config.observability)?;

    tracing::info!("access-logger v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        debug_rules = config.access_log.debug_requests.len(),
        max_body_size = config.access_log.max_body_size,
        flatten = config.access_log.flatten,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown.trigger_on_ctrl_c().await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
