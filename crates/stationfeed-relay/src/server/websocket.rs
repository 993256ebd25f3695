//! WebSocket viewer endpoint
//!
//! Broadcasts never write to a socket directly. Each viewer has a bounded
//! queue drained by its own writer task, so a viewer that stops reading only
//! fills its own queue and is then dropped.

use crate::registry::{Viewer, ViewerRegistry, ViewerTransport};
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use stationfeed_core::{Error, Result};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Outbound side of a viewer's WebSocket
pub struct WebSocketTransport {
    queue: mpsc::Sender<String>,
}

impl WebSocketTransport {
    /// Start a writer task forwarding queued frames to `sink`
    ///
    /// The task ends on the first write error or once the transport is dropped.
    pub fn spawn<S>(mut sink: S, capacity: usize) -> (Self, JoinHandle<()>)
    where
        S: Sink<Message> + Unpin + Send + 'static,
        S::Error: Display,
    {
        let (queue, mut frames) = mpsc::channel::<String>(capacity.max(1));

        let writer = tokio::spawn(async move {
            while let Some(text) = frames.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    debug!("Viewer write failed: {}", e);
                    break;
                }
            }
        });

        (Self { queue }, writer)
    }
}

#[async_trait]
impl ViewerTransport for WebSocketTransport {
    async fn send(&self, text: &str) -> Result<()> {
        self.queue.try_send(text.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => Error::delivery("viewer is not keeping up, send queue full"),
            TrySendError::Closed(_) => Error::delivery("viewer connection closed"),
        })
    }
}

/// Shared state of the viewer endpoint
#[derive(Clone)]
pub struct ViewerEndpoint {
    pub registry: Arc<ViewerRegistry>,
    pub queue_capacity: usize,
}

/// Upgrade handler for viewer connections
pub async fn viewer_handler(
    ws: WebSocketUpgrade,
    State(endpoint): State<ViewerEndpoint>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_viewer(socket, endpoint))
}

async fn handle_viewer(socket: WebSocket, endpoint: ViewerEndpoint) {
    let ViewerEndpoint {
        registry,
        queue_capacity,
    } = endpoint;
    let (sender, mut receiver) = socket.split();

    let (transport, writer) = WebSocketTransport::spawn(sender, queue_capacity);
    let viewer = Viewer::new(Arc::new(transport));
    let link = viewer.link();
    registry.register(viewer);
    info!(viewer = %link.handle(), "Viewer connected");

    // Viewers never send anything meaningful; read only to notice the close
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(msg) => trace!(viewer = %link.handle(), "Ignoring viewer frame: {:?}", msg),
            Err(e) => {
                debug!(viewer = %link.handle(), "Viewer connection error: {}", e);
                break;
            }
        }
    }

    link.close();
    registry.unregister(link.handle());
    writer.abort();
    info!(viewer = %link.handle(), "Viewer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::Broadcaster;
    use futures::channel::mpsc as sink_channel;
    use parking_lot::Mutex;
    use stationfeed_core::{decode, Payload, RawMessage};
    use std::time::Duration;
    use tokio::time::timeout;

    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl ViewerTransport for Recorder {
        async fn send(&self, text: &str) -> Result<()> {
            self.0.lock().push(text.to_string());
            Ok(())
        }
    }

    fn payload(text: &'static str) -> Payload {
        Payload::from(decode(RawMessage::from(text)))
    }

    #[tokio::test]
    async fn test_frames_reach_the_sink() {
        let (sink, mut written) = sink_channel::channel::<Message>(8);
        let (transport, _writer) = WebSocketTransport::spawn(sink, 4);

        transport.send("one").await.unwrap();
        transport.send("two").await.unwrap();

        for expected in ["one", "two"] {
            match timeout(Duration::from_secs(1), written.next()).await.unwrap() {
                Some(Message::Text(text)) => assert_eq!(text, expected),
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_stalled_viewer_does_not_block_broadcast() {
        // Zero-capacity sink whose reader never reads: the writer blocks after one frame
        let (stalled_sink, _never_read) = sink_channel::channel::<Message>(0);
        let (stalled, _writer) = WebSocketTransport::spawn(stalled_sink, 2);

        let registry = Arc::new(ViewerRegistry::new());
        let stalled = Viewer::new(Arc::new(stalled));
        registry.register(stalled.clone());
        let healthy = Arc::new(Recorder(Mutex::new(Vec::new())));
        registry.register(Viewer::new(healthy.clone()));
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let mut failed = 0;
        for _ in 0..6 {
            let report = timeout(Duration::from_secs(1), broadcaster.broadcast(&payload("tick")))
                .await
                .expect("broadcast blocked on a stalled viewer");
            failed += report.failed;
            tokio::task::yield_now().await;
        }

        assert_eq!(failed, 1);
        assert!(!registry.contains(stalled.handle()));
        assert_eq!(healthy.0.lock().len(), 6);
    }

    #[tokio::test]
    async fn test_send_after_writer_stopped_fails() {
        let (sink, written) = sink_channel::channel::<Message>(1);
        drop(written);
        let (transport, writer) = WebSocketTransport::spawn(sink, 4);

        // First frame hits the closed sink and ends the writer
        transport.send("first").await.unwrap();
        writer.await.unwrap();

        assert!(transport.send("second").await.is_err());
    }
}
