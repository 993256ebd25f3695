//! Upstream feed subscription

pub mod backoff;
pub mod endpoint;
pub mod source;
pub mod subscriber;

pub use backoff::Backoff;
pub use endpoint::UpstreamEndpoint;
pub use source::{FeedSource, ZmqFeed};
pub use subscriber::Subscriber;
