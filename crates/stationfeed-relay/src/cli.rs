use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "stationfeed-relay")]
#[command(
    author,
    version,
    about = "Relay platform status events from a ZeroMQ feed to WebSocket viewers"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "stationfeed.yaml")]
    pub config: String,

    /// Upstream feed endpoint (tcp://host:port)
    #[arg(short, long, env = "STATIONFEED_UPSTREAM")]
    pub upstream: Option<String>,

    /// Listen address for both endpoints
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// WebSocket viewer port
    #[arg(long, env = "STATIONFEED_VIEWER_PORT")]
    pub viewer_port: Option<u16>,

    /// Status page port
    #[arg(long, env = "STATIONFEED_PAGE_PORT")]
    pub page_port: Option<u16>,

    /// Do not serve the status page
    #[arg(long)]
    pub no_status_page: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
