//! Upstream receive loop
//!
//! Connection loss is never fatal: the subscriber waits out the backoff delay,
//! reconnects, and keeps producing messages as if nothing happened.

use super::backoff::Backoff;
use super::source::FeedSource;
use crate::broadcaster::{BroadcastReport, Broadcaster};
use crate::telemetry::{MESSAGES_TOTAL, UPSTREAM_RECONNECTS_TOTAL};
use futures::stream::{self, Stream, StreamExt};
use stationfeed_core::{decode, Payload, RawMessage};
use tracing::{debug, info, warn};

/// Holds the upstream subscription and turns it into a message stream
pub struct Subscriber<S> {
    source: S,
    backoff: Backoff,
    connected: bool,
}

impl<S: FeedSource> Subscriber<S> {
    /// Subscribe to the upstream feed
    ///
    /// An unreachable upstream is logged and retried later; the publisher is
    /// allowed to appear after the subscriber.
    pub async fn connect(mut source: S, backoff: Backoff) -> Self {
        let connected = match source.connect().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Upstream not reachable yet, will retry: {}", e);
                metrics::counter!(UPSTREAM_RECONNECTS_TOTAL).increment(1);
                false
            }
        };

        Self {
            source,
            backoff,
            connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Wait for the next upstream message, reconnecting as often as needed
    async fn next_message(&mut self) -> RawMessage {
        loop {
            if !self.connected {
                let delay = self.backoff.next_delay();
                debug!("Reconnecting to {} in {:?}", self.source.endpoint(), delay);
                tokio::time::sleep(delay).await;

                match self.source.connect().await {
                    Ok(()) => {
                        info!("Upstream connection to {} established", self.source.endpoint());
                        self.connected = true;
                    }
                    Err(e) => {
                        warn!("Upstream reconnect failed: {}", e);
                        metrics::counter!(UPSTREAM_RECONNECTS_TOTAL).increment(1);
                        continue;
                    }
                }
            }

            match self.source.recv().await {
                Ok(raw) => {
                    self.backoff.reset();
                    return raw;
                }
                Err(e) => {
                    warn!("Upstream receive failed, reconnecting: {}", e);
                    self.connected = false;
                }
            }
        }
    }

    /// Lazy, endless stream of upstream messages
    pub fn into_messages(self) -> impl Stream<Item = RawMessage> {
        stream::unfold(self, |mut subscriber| async move {
            let raw = subscriber.next_message().await;
            Some((raw, subscriber))
        })
    }

    /// Relay every upstream message to the broadcaster; never returns
    pub async fn run(self, broadcaster: Broadcaster) {
        let messages = self.into_messages();
        futures::pin_mut!(messages);

        while let Some(raw) = messages.next().await {
            relay(&broadcaster, raw).await;
        }
    }
}

/// Decode one upstream message and broadcast it, falling back to the raw bytes
pub async fn relay(broadcaster: &Broadcaster, raw: RawMessage) -> BroadcastReport {
    let payload = match decode(raw) {
        Ok(event) => {
            if event.unknown_status_count() > 0 {
                debug!(
                    "Forwarding {} platform(s) with unrecognized status",
                    event.unknown_status_count()
                );
            }
            Payload::Status(event)
        }
        Err(failure) => {
            warn!("Forwarding undecodable upstream message verbatim: {}", failure);
            Payload::Raw(failure.raw)
        }
    };

    metrics::counter!(MESSAGES_TOTAL, "kind" => payload.kind()).increment(1);
    broadcaster.broadcast(&payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Viewer, ViewerRegistry, ViewerTransport};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use stationfeed_core::{Error, Result};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    enum Step {
        ConnectFails,
        Message(&'static str),
        RecvFails,
    }

    /// Plays back a fixed script, then waits forever
    struct ScriptedFeed {
        steps: VecDeque<Step>,
        connects: Arc<Mutex<usize>>,
    }

    impl ScriptedFeed {
        fn new(steps: Vec<Step>) -> (Self, Arc<Mutex<usize>>) {
            let connects = Arc::new(Mutex::new(0));
            let feed = Self {
                steps: steps.into(),
                connects: Arc::clone(&connects),
            };
            (feed, connects)
        }
    }

    #[async_trait]
    impl FeedSource for ScriptedFeed {
        fn endpoint(&self) -> &str {
            "scripted://feed"
        }

        async fn connect(&mut self) -> Result<()> {
            *self.connects.lock() += 1;
            if matches!(self.steps.front(), Some(Step::ConnectFails)) {
                self.steps.pop_front();
                return Err(Error::connection("scripted://feed", "refused"));
            }
            Ok(())
        }

        async fn recv(&mut self) -> Result<RawMessage> {
            match self.steps.pop_front() {
                Some(Step::Message(text)) => Ok(RawMessage::from(text)),
                Some(Step::RecvFails) => Err(Error::connection("scripted://feed", "reset")),
                Some(Step::ConnectFails) => unreachable!("connect failure scripted mid-stream"),
                None => std::future::pending().await,
            }
        }
    }

    fn backoff() -> Backoff {
        Backoff::new(Duration::from_millis(10), Duration::from_millis(40), 2.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_before_publisher_exists() {
        let (feed, connects) = ScriptedFeed::new(vec![
            Step::ConnectFails,
            Step::ConnectFails,
            Step::Message("hello"),
        ]);

        let subscriber = Subscriber::connect(feed, backoff()).await;
        assert!(!subscriber.is_connected());

        let messages = subscriber.into_messages();
        futures::pin_mut!(messages);
        let first = messages.next().await.unwrap();

        assert_eq!(first.as_bytes(), b"hello");
        assert_eq!(*connects.lock(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_error_resumes_after_reconnect() {
        let (feed, connects) = ScriptedFeed::new(vec![
            Step::Message("one"),
            Step::RecvFails,
            Step::Message("two"),
        ]);

        let subscriber = Subscriber::connect(feed, backoff()).await;
        assert!(subscriber.is_connected());

        let received: Vec<_> = subscriber
            .into_messages()
            .take(2)
            .map(|raw| raw.to_text().into_owned())
            .collect()
            .await;

        assert_eq!(received, vec!["one", "two"]);
        assert_eq!(*connects.lock(), 2);
    }

    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl ViewerTransport for Collect {
        async fn send(&self, text: &str) -> Result<()> {
            self.0.lock().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_relay_status_then_fallback() {
        let registry = Arc::new(ViewerRegistry::new());
        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        registry.register(Viewer::new(sink.clone()));
        let broadcaster = Broadcaster::new(registry);

        relay(
            &broadcaster,
            RawMessage::from(r#"{"trains": [{"platform": 1, "status": "arriving"}]}"#),
        )
        .await;
        relay(&broadcaster, RawMessage::from("not-json")).await;

        assert_eq!(
            *sink.0.lock(),
            vec![
                r#"{"trains":[{"platform":1,"status":"arriving"}]}"#.to_string(),
                "not-json".to_string(),
            ]
        );
    }
}
