use crate::broadcaster::Broadcaster;
use crate::config::RelayConfig;
use crate::registry::ViewerRegistry;
use crate::server::{status_page, websocket};
use crate::upstream::{FeedSource, Subscriber};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Build the viewer WebSocket application
pub fn build_viewer_app(endpoint: websocket::ViewerEndpoint) -> Router {
    Router::new()
        .route("/", get(websocket::viewer_handler))
        .route("/ws", get(websocket::viewer_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(endpoint)
}

/// Build the status page application
pub fn build_page_app(state: status_page::PageState) -> Router {
    Router::new()
        .route("/health", get(status_page::health))
        .route("/metrics", get(status_page::render_metrics))
        .fallback(status_page::serve_page)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bound listeners plus the shared viewer registry
pub struct RelayServer {
    registry: Arc<ViewerRegistry>,
    viewer_listener: TcpListener,
    page_listener: Option<TcpListener>,
    queue_capacity: usize,
    metrics: Option<PrometheusHandle>,
}

impl RelayServer {
    /// Bind the viewer and status page listeners
    pub async fn bind(config: &RelayConfig, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let viewer_listener = TcpListener::bind(config.viewer.socket_addr()?).await?;

        let page_listener = if config.status_page.enabled {
            Some(TcpListener::bind(config.status_page.socket_addr()?).await?)
        } else {
            None
        };

        Ok(Self {
            registry: Arc::new(ViewerRegistry::new()),
            viewer_listener,
            page_listener,
            queue_capacity: config.viewer.queue_capacity,
            metrics,
        })
    }

    pub fn registry(&self) -> Arc<ViewerRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn viewer_addr(&self) -> std::io::Result<SocketAddr> {
        self.viewer_listener.local_addr()
    }

    pub fn page_addr(&self) -> Option<SocketAddr> {
        self.page_listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Relay upstream messages to viewers until `shutdown` completes
    pub async fn run<S>(
        self,
        subscriber: Subscriber<S>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()>
    where
        S: FeedSource + 'static,
    {
        let viewer_addr = self.viewer_addr()?;
        let broadcaster = Broadcaster::new(self.registry());
        let relay_task = tokio::spawn(subscriber.run(broadcaster));

        let page_task = match self.page_listener {
            Some(listener) => {
                let app = build_page_app(status_page::PageState::new(viewer_addr.port(), self.metrics));
                if let Ok(addr) = listener.local_addr() {
                    info!("Status page on http://{}", addr);
                }
                Some(tokio::spawn(async move {
                    if let Err(e) = axum::serve(listener, app).into_future().await {
                        error!("Status page server failed: {}", e);
                    }
                }))
            }
            None => None,
        };

        info!("Viewers connect to ws://{}", viewer_addr);
        let endpoint = websocket::ViewerEndpoint {
            registry: self.registry,
            queue_capacity: self.queue_capacity,
        };
        let result = axum::serve(self.viewer_listener, build_viewer_app(endpoint))
            .with_graceful_shutdown(shutdown)
            .await;

        // No drain: in-flight broadcasts are dropped
        relay_task.abort();
        if let Some(task) = page_task {
            task.abort();
        }

        result?;
        info!("Relay stopped");
        Ok(())
    }
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, stopping relay...");
}
