//! Fan-out of one payload to every open viewer
//!
//! Each broadcast works on a registry snapshot and attempts every viewer
//! independently. A failed send removes that viewer and nothing else; the
//! relay itself never sees the error. There is no retry and no backlog, so
//! delivery is at most once per viewer per message.

use crate::registry::{Viewer, ViewerRegistry};
use crate::telemetry::DELIVERIES_TOTAL;
use futures::future::join_all;
use stationfeed_core::Payload;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Result of one delivery attempt to one viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Viewer was no longer open
    Skipped,
    /// Transport error; the viewer has been unregistered
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Skipped => "skipped",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

/// Per-broadcast tally of outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }

    fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::Skipped => self.skipped += 1,
            DeliveryOutcome::Failed => self.failed += 1,
        }
    }
}

/// Delivers payloads to the viewers of a registry
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ViewerRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ViewerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ViewerRegistry> {
        &self.registry
    }

    /// Deliver `payload` to every viewer open at snapshot time
    pub async fn broadcast(&self, payload: &Payload) -> BroadcastReport {
        let text = match payload.to_wire() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize {} payload: {}", payload.kind(), e);
                return BroadcastReport::default();
            }
        };

        let viewers = self.registry.snapshot();
        let attempts = viewers.iter().map(|viewer| self.deliver(viewer, &text));
        let outcomes = join_all(attempts).await;

        let mut report = BroadcastReport::default();
        for outcome in outcomes {
            report.record(outcome);
            metrics::counter!(DELIVERIES_TOTAL, "outcome" => outcome.as_str()).increment(1);
        }

        debug!(
            kind = payload.kind(),
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "Broadcast complete"
        );
        report
    }

    async fn deliver(&self, viewer: &Viewer, text: &str) -> DeliveryOutcome {
        if !viewer.is_open() {
            return DeliveryOutcome::Skipped;
        }

        match viewer.send(text).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!(viewer = %viewer.handle(), "Dropping viewer after send failure: {}", e);
                self.registry.unregister(viewer.handle());
                DeliveryOutcome::Failed
            }
        }
    }
}
