//! finance-server
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (Axum, request ID, tracing, body read)
//!                         │
//!                         ▼
//!                     http::app ──── OPTIONS ──▶ 200, empty body
//!                         │
//!                         ▼
//!                     routing (first match, :params)
//!                         │
//!                         ▼
//!                     middleware chain
//!                       ├─ security::rate_limit (429 on exhaustion)
//!                       └─ controller (ping)
//!                         │
//!                         ▼
//!     Client Response ◀── envelope {success, code, error, result}
//!                         + CORS / security headers
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use finance_server::config::{self, Overrides, ServerConfig};
use finance_server::http::HttpServer;
use finance_server::lifecycle::{signals, startup, Shutdown};
use finance_server::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "finance-server")]
#[command(about = "HTTP request-dispatch server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "FINANCE_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configured bind address port.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Allowed CORS origin.
    #[arg(long, env = "CLIENT_BASE_URL")]
    client_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    let config = config::apply_overrides(
        config,
        &Overrides {
            port: cli.port,
            client_base_url: cli.client_base_url,
        },
    )?;

    logging::init_logging(&config.observability);

    tracing::info!("finance-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let limiter = startup::start_rate_limiter(&config);
    let app = startup::build_app(&config, &limiter);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&signal_shutdown).await;
    });

    let server = HttpServer::new(config, app);
    let result = server.run(listener, server_shutdown).await;

    limiter.stop();
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}
