//! ZmqFeed against a real ZeroMQ publisher

use std::collections::HashSet;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use zeromq::{PubSocket, Socket, SocketSend, ZmqMessage};

use stationfeed_core::RawMessage;
use stationfeed_relay::{Backoff, Subscriber, UpstreamEndpoint, ZmqFeed};

const TIMEOUT: Duration = Duration::from_secs(8);

/// Publishes a fixed set of messages every 50 ms until stopped
struct Publisher {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Publisher {
    fn start(endpoint: &str, messages: &[&'static str]) -> Self {
        let endpoint = endpoint.to_string();
        let messages = messages.to_vec();
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut socket = PubSocket::new();
            // The previous publisher's port may take a moment to free up
            while socket.bind(&endpoint).await.is_err() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {
                        for text in &messages {
                            let _ = socket.send(ZmqMessage::from(text.to_string())).await;
                        }
                    }
                }
            }

            socket.close().await;
        });

        Self { stop, task }
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

fn free_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    format!("tcp://127.0.0.1:{}", port)
}

async fn subscribe(endpoint: &str) -> Subscriber<ZmqFeed> {
    let feed = ZmqFeed::new(
        UpstreamEndpoint::parse(endpoint).unwrap(),
        Duration::from_millis(300),
    );
    let backoff = Backoff::new(Duration::from_millis(20), Duration::from_millis(200), 2.0);
    Subscriber::connect(feed, backoff).await
}

async fn next_text(messages: &mut (impl Stream<Item = RawMessage> + Unpin)) -> String {
    timeout(TIMEOUT, messages.next())
        .await
        .expect("no upstream message in time")
        .expect("message stream ended")
        .to_text()
        .into_owned()
}

#[tokio::test]
async fn test_subscribe_before_publisher_binds() {
    let endpoint = free_endpoint();
    let subscriber = subscribe(&endpoint).await;

    let publisher = Publisher::start(&endpoint, &["hello"]);

    let messages = subscriber.into_messages();
    futures::pin_mut!(messages);
    assert_eq!(next_text(&mut messages).await, "hello");

    publisher.stop().await;
}

#[tokio::test]
async fn test_receives_every_topic() {
    let endpoint = free_endpoint();
    let publisher = Publisher::start(
        &endpoint,
        &["weather.rome sunny", r#"{"trains":[{"platform":4,"status":"idle"}]}"#],
    );
    let subscriber = subscribe(&endpoint).await;

    let messages = subscriber.into_messages();
    futures::pin_mut!(messages);

    let mut seen = HashSet::new();
    while seen.len() < 2 {
        seen.insert(next_text(&mut messages).await);
    }
    assert!(seen.contains("weather.rome sunny"));
    assert!(seen.contains(r#"{"trains":[{"platform":4,"status":"idle"}]}"#));

    publisher.stop().await;
}

#[tokio::test]
async fn test_resumes_after_publisher_restart() {
    let endpoint = free_endpoint();
    let first = Publisher::start(&endpoint, &["one"]);
    let subscriber = subscribe(&endpoint).await;

    let messages = subscriber.into_messages();
    futures::pin_mut!(messages);
    assert_eq!(next_text(&mut messages).await, "one");

    first.stop().await;
    let second = Publisher::start(&endpoint, &["two"]);

    let resumed = timeout(TIMEOUT, async {
        loop {
            if next_text(&mut messages).await == "two" {
                break;
            }
        }
    })
    .await;
    assert!(resumed.is_ok(), "subscriber never resumed after publisher restart");

    second.stop().await;
}
