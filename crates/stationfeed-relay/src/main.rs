//! Stationfeed Relay
//!
//! Bridges the station's ZeroMQ status publisher to browser viewers.

use anyhow::Result;
use clap::Parser;
use stationfeed_relay::server::shutdown_signal;
use stationfeed_relay::telemetry::{init_metrics, init_tracing};
use stationfeed_relay::{Cli, RelayConfig, RelayServer, Subscriber, UpstreamEndpoint, ZmqFeed};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    info!("Starting stationfeed relay");

    // Load configuration
    let config = RelayConfig::load(&cli.config, &cli)?;
    info!("Upstream: {}", config.upstream.endpoint);

    let metrics_handle = init_metrics()?;

    let server = RelayServer::bind(&config, Some(metrics_handle)).await?;

    let endpoint = UpstreamEndpoint::parse(&config.upstream.endpoint)?;
    let reconnect = &config.upstream.reconnect;
    let feed = ZmqFeed::new(endpoint, reconnect.idle_timeout());
    let subscriber = Subscriber::connect(feed, reconnect.backoff()).await;

    server.run(subscriber, shutdown_signal()).await
}
