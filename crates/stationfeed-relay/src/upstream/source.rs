//! Upstream message sources

use super::endpoint::UpstreamEndpoint;
use async_trait::async_trait;
use stationfeed_core::{Error, RawMessage, Result};
use std::time::Duration;
use tracing::info;
use zeromq::{Socket, SocketRecv, SubSocket};

/// A subscription to a pub/sub feed
#[async_trait]
pub trait FeedSource: Send {
    /// Endpoint description used in logs
    fn endpoint(&self) -> &str;

    /// Open the subscription for all topics
    ///
    /// Any previous connection is discarded first.
    async fn connect(&mut self) -> Result<()>;

    /// Wait for the next message
    async fn recv(&mut self) -> Result<RawMessage>;
}

/// ZeroMQ SUB socket subscribed to every topic
///
/// The socket silently forgets a publisher that goes away, so silence longer
/// than `idle_timeout` is treated as a lost connection.
pub struct ZmqFeed {
    endpoint: UpstreamEndpoint,
    idle_timeout: Duration,
    socket: Option<SubSocket>,
}

impl ZmqFeed {
    pub fn new(endpoint: UpstreamEndpoint, idle_timeout: Duration) -> Self {
        Self {
            endpoint,
            idle_timeout,
            socket: None,
        }
    }
}

#[async_trait]
impl FeedSource for ZmqFeed {
    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn connect(&mut self) -> Result<()> {
        self.socket = None;

        let mut socket = SubSocket::new();
        socket
            .connect(self.endpoint.as_str())
            .await
            .map_err(|e| Error::connection(self.endpoint.as_str(), e.to_string()))?;
        socket
            .subscribe("")
            .await
            .map_err(|e| Error::connection(self.endpoint.as_str(), e.to_string()))?;

        info!("Subscribed to all topics on {}", self.endpoint);
        self.socket = Some(socket);
        Ok(())
    }

    async fn recv(&mut self) -> Result<RawMessage> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| Error::connection(self.endpoint.as_str(), "not connected"))?;

        let message = match tokio::time::timeout(self.idle_timeout, socket.recv()).await {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => {
                self.socket = None;
                return Err(Error::connection(self.endpoint.as_str(), e.to_string()));
            }
            Err(_) => {
                self.socket = None;
                return Err(Error::connection(
                    self.endpoint.as_str(),
                    format!("no message for {:?}", self.idle_timeout),
                ));
            }
        };

        // Publishers send single-frame messages; only the first frame is relayed
        let frame = message.into_vec().into_iter().next().unwrap_or_default();
        Ok(RawMessage::new(frame))
    }
}
