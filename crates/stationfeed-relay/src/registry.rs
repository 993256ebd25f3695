//! Registry of connected viewers
//!
//! Membership is the only state shared between the broadcast path and the
//! connection handlers. Every mutation and every snapshot copy happens under
//! one short lock; broadcasts iterate the copy without holding it.

use async_trait::async_trait;
use parking_lot::Mutex;
use stationfeed_core::Result;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier of one viewer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerHandle(Uuid);

impl ViewerHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection state of a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Open,
    Closed,
}

/// Outbound side of a viewer connection
///
/// A send either transfers the whole text frame or fails.
#[async_trait]
pub trait ViewerTransport: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// One connected viewer
#[derive(Clone)]
pub struct Viewer {
    handle: ViewerHandle,
    open: Arc<AtomicBool>,
    transport: Arc<dyn ViewerTransport>,
}

impl Viewer {
    /// Create an open viewer around a transport
    pub fn new(transport: Arc<dyn ViewerTransport>) -> Self {
        Self {
            handle: ViewerHandle::new(),
            open: Arc::new(AtomicBool::new(true)),
            transport,
        }
    }

    pub fn handle(&self) -> ViewerHandle {
        self.handle
    }

    pub fn state(&self) -> ViewerState {
        if self.open.load(Ordering::Acquire) {
            ViewerState::Open
        } else {
            ViewerState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ViewerState::Open
    }

    /// Send one text frame to this viewer
    pub async fn send(&self, text: &str) -> Result<()> {
        self.transport.send(text).await
    }

    /// Link kept by the connection task to report closure
    pub fn link(&self) -> ViewerLink {
        ViewerLink {
            handle: self.handle,
            open: Arc::clone(&self.open),
        }
    }
}

impl fmt::Debug for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewer")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .finish()
    }
}

/// Connection-side view of a viewer: its handle and the ability to close it
#[derive(Debug, Clone)]
pub struct ViewerLink {
    handle: ViewerHandle,
    open: Arc<AtomicBool>,
}

impl ViewerLink {
    pub fn handle(&self) -> ViewerHandle {
        self.handle
    }

    /// Mark the viewer closed; in-flight broadcasts will skip it
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

/// Concurrency-safe set of connected viewers
#[derive(Default)]
pub struct ViewerRegistry {
    viewers: Mutex<Vec<Viewer>>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a viewer
    ///
    /// Returns `false` without changing anything if the handle is already registered.
    pub fn register(&self, viewer: Viewer) -> bool {
        let mut viewers = self.viewers.lock();
        if viewers.iter().any(|v| v.handle == viewer.handle) {
            return false;
        }
        tracing::debug!(viewer = %viewer.handle, "Viewer registered");
        viewers.push(viewer);
        metrics::gauge!(crate::telemetry::VIEWERS).set(viewers.len() as f64);
        true
    }

    /// Remove a viewer; unknown handles are ignored
    pub fn unregister(&self, handle: ViewerHandle) {
        let mut viewers = self.viewers.lock();
        let before = viewers.len();
        viewers.retain(|v| v.handle != handle);
        if viewers.len() != before {
            tracing::debug!(viewer = %handle, "Viewer unregistered");
            metrics::gauge!(crate::telemetry::VIEWERS).set(viewers.len() as f64);
        }
    }

    /// Point-in-time copy of the open viewers, in connect order
    pub fn snapshot(&self) -> Vec<Viewer> {
        self.viewers
            .lock()
            .iter()
            .filter(|v| v.is_open())
            .cloned()
            .collect()
    }

    pub fn contains(&self, handle: ViewerHandle) -> bool {
        self.viewers.lock().iter().any(|v| v.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.viewers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.lock().is_empty()
    }
}
