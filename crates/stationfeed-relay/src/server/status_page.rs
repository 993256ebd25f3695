//! Status page and operational endpoints
//!
//! The page is a passive viewer: it opens a WebSocket to the viewer port on
//! the host it was loaded from and renders whatever status it receives.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

const VIEWER_PORT_PLACEHOLDER: &str = "__VIEWER_PORT__";

/// Shared state of the status page server
#[derive(Clone)]
pub struct PageState {
    html: Arc<str>,
    metrics: Option<PrometheusHandle>,
}

impl PageState {
    pub fn new(viewer_port: u16, metrics: Option<PrometheusHandle>) -> Self {
        let html = STATUS_PAGE_HTML.replace(VIEWER_PORT_PLACEHOLDER, &viewer_port.to_string());
        Self {
            html: html.into(),
            metrics,
        }
    }
}

/// Serve the status page for any path
pub async fn serve_page(State(state): State<PageState>) -> Html<String> {
    Html(state.html.to_string())
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus text exposition
pub async fn render_metrics(State(state): State<PageState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

const STATUS_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Station Status</title>
    <style>
        body { font-family: Arial, sans-serif; background: #f4f4f9; color: #333; margin: 0;
               display: flex; flex-direction: column; align-items: center; }
        h1 { margin: 20px 0; font-size: 2.5rem; }
        #platforms { display: grid; grid-template-columns: repeat(2, minmax(300px, 1fr));
                     gap: 20px; width: 80%; max-width: 800px; }
        .platform { border: 2px solid black; border-radius: 8px; padding: 20px;
                    text-align: center; box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1); }
        .platform .status { font-size: 2rem; margin: 10px 0; font-weight: bold; }
        .platform.idle { background: lightgray; }
        .platform.arriving { background: yellow; }
        .platform.stopped { background: darkorange; }
        .platform.ready_to_depart { background: greenyellow; }
        .platform.departing { background: deepskyblue; }
        #connection { margin-top: 20px; color: #777; }
    </style>
</head>
<body>
    <h1>Station Status</h1>
    <div id="platforms"></div>
    <div id="connection">Connecting...</div>
    <script>
        const states = ["idle", "arriving", "stopped", "ready_to_depart", "departing"];
        const container = document.getElementById("platforms");
        const connection = document.getElementById("connection");

        function platformDiv(platform) {
            let div = document.getElementById(`platform-${platform}`);
            if (!div) {
                div = document.createElement("div");
                div.id = `platform-${platform}`;
                container.appendChild(div);
                [...container.children]
                    .sort((a, b) => Number(a.id.split("-")[1]) - Number(b.id.split("-")[1]))
                    .forEach((child) => container.appendChild(child));
            }
            return div;
        }

        function connect() {
            const ws = new WebSocket(`ws://${window.location.hostname}:__VIEWER_PORT__/`);
            ws.onopen = () => { connection.textContent = "Live"; };
            ws.onclose = () => {
                connection.textContent = "Disconnected, retrying...";
                setTimeout(connect, 2000);
            };
            ws.onmessage = (event) => {
                let data;
                try {
                    data = JSON.parse(event.data);
                } catch (err) {
                    console.error("Unparseable status message:", event.data);
                    return;
                }
                (data.trains || []).forEach((train) => {
                    const div = platformDiv(train.platform);
                    const state = states.includes(train.status) ? train.status : "idle";
                    div.className = "platform " + state;
                    div.innerHTML = "";
                    const title = document.createElement("h2");
                    title.textContent = `Platform ${train.platform}`;
                    const status = document.createElement("div");
                    status.className = "status";
                    status.textContent = train.status;
                    div.append(title, status);
                });
            };
        }

        connect();
    </script>
</body>
</html>
"#;
