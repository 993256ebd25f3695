//! Stationfeed Relay
//!
//! Subscribes to an upstream platform status feed and pushes every message
//! to all connected WebSocket viewers.

pub mod broadcaster;
pub mod cli;
pub mod config;
pub mod registry;
pub mod server;
pub mod telemetry;
pub mod upstream;

pub use broadcaster::{BroadcastReport, Broadcaster, DeliveryOutcome};
pub use cli::Cli;
pub use config::RelayConfig;
pub use registry::{Viewer, ViewerHandle, ViewerLink, ViewerRegistry, ViewerState, ViewerTransport};
pub use server::RelayServer;
pub use upstream::{Backoff, FeedSource, Subscriber, UpstreamEndpoint, ZmqFeed};
