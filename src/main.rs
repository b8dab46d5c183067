//! Canister HTTP gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                   CANISTER GATEWAY                    │
//!                      │                                                       │
//!   Client Request     │  ┌─────────┐    ┌─────────┐    ┌──────────────┐       │
//!   ───────────────────┼─▶│  http   │───▶│ routing │───▶│   gateway    │       │
//!                      │  │ server  │    │         │    │  pipeline    │       │
//!                      │  └─────────┘    └─────────┘    └──────┬───────┘       │
//!                      │                                       │               │
//!                      │                     ┌─────────────────┼────────────┐  │
//!                      │                     ▼                 ▼            ▼  │
//!                      │               ┌──────────┐    ┌────────────┐ ┌──────┐ │
//!                      │               │ ic agent │    │ certificate│ │fetch │ │──▶ Replica
//!                      │               │transport │    │  verifier  │ │      │ │
//!                      │               └──────────┘    └────────────┘ └──────┘ │
//!                      │                                                       │
//!                      │  Cross-cutting: config, observability, lifecycle      │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use canister_gateway::config::loader::{finalize_config, read_config};
use canister_gateway::config::GatewayConfig;
use canister_gateway::http::{HttpFetcher, HttpServer};
use canister_gateway::ic::{AgentTransportFactory, CertificateVerifier};
use canister_gateway::lifecycle::{signals, Shutdown};
use canister_gateway::observability::{logging, metrics};
use canister_gateway::Gateway;

#[derive(Parser, Debug)]
#[command(name = "canister-gateway")]
#[command(about = "HTTP gateway for Internet Computer canisters", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    let config = finalize_config(config, |key| std::env::var(key).ok())?;

    logging::init_logging(&config.observability);
    tracing::info!("canister-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        root_domain = %config.domain.root,
        local_mode = config.domain.is_local_mode(),
        aliases = config.domain.aliases.len(),
        fetch_root_key = config.replica.fetch_root_key,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let transports = Arc::new(AgentTransportFactory::new(
        config.replica.fetch_root_key,
        Duration::from_secs(config.replica.max_certificate_age_secs),
    ));
    let verifier = Arc::new(CertificateVerifier::new());
    let fetcher = Arc::new(HttpFetcher::new(&config.timeouts)?);
    let gateway = Arc::new(Gateway::from_config(&config, transports, verifier, fetcher)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown.clone());

    HttpServer::new(gateway, &config)
        .run(listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
