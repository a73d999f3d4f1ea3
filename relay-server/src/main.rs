use anyhow::Context;
use clap::Parser;
use relay_core::config::{self, RelayConfig};
use relay_server::{create_router, telemetry, AppState};
use std::path::PathBuf;
use tracing::info;

/// Canonical-format LLM reverse proxy
#[derive(Parser, Debug)]
#[command(name = "relay", version, about)]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, overrides `server.host`
    #[arg(long, env = "RELAY_HOST")]
    host: Option<String>,

    /// Listen port, overrides `server.port`
    #[arg(short, long, env = "RELAY_PORT")]
    port: Option<u16>,

    /// Log level or filter directive, overrides `logging.level`
    #[arg(long, env = "RELAY_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RelayConfig::default(),
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    telemetry::init_logging(&config.logging, cli.log_level.as_deref());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let providers: Vec<String> = config
        .providers
        .iter()
        .filter(|p| p.enabled)
        .map(|p| format!("{}({:?})", p.name(), p.cost_tier))
        .collect();

    let state = AppState::new(config).context("failed to build upstream HTTP client")?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("relay {} listening on {}", env!("CARGO_PKG_VERSION"), addr);
    info!("Balancing providers: {}", providers.join(", "));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
