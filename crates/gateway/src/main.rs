//! Transaction lookup gateway.
//!
//! Serves the lookup endpoint in front of the Flow Access REST API.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use txlookup_access::FlowAccessService;
use txlookup_api::{start_server, AppState};

mod settings;

use settings::{GatewayConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "txlookup")]
#[command(about = "Look up blockchain transactions over HTTP")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Path the lookup endpoint is served on
    #[arg(long)]
    route: Option<String>,

    /// Network used when a request does not name one
    #[arg(long)]
    default_network: Option<String>,

    /// Log filter, e.g. `info` or `txlookup_api=debug`
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(route) = self.route {
            config.route = route;
        }
        if let Some(network) = self.default_network {
            config.default_network = network;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = GatewayConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    init_logging(&config);

    let access = build_access_service(&config)?;
    info!("Known networks: {}", access.networks().join(", "));
    info!("Default network: {}", config.default_network);

    let state = AppState::new(Arc::new(access)).with_default_network(config.default_network.clone());
    start_server(state, &config.bind_addr(), &config.route).await
}

fn build_access_service(config: &GatewayConfig) -> Result<FlowAccessService> {
    let mut access =
        FlowAccessService::with_timeout(Duration::from_millis(config.request_timeout_ms))
            .context("failed to build HTTP client")?;
    for (network, url) in &config.networks {
        access
            .set_endpoint(network, url)
            .with_context(|| format!("invalid endpoint for network {network}"))?;
    }
    if access.endpoint(&config.default_network).is_none() {
        anyhow::bail!(
            "default network {} has no configured endpoint",
            config.default_network
        );
    }
    Ok(access)
}

fn init_logging(config: &GatewayConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }
}
