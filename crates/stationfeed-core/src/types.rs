//! Core types for stationfeed

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// An opaque message exactly as it arrived from the upstream feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage(Bytes);

impl RawMessage {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text view of the bytes; invalid UTF-8 sequences are replaced
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&'static str> for RawMessage {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Vec<u8>> for RawMessage {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<Bytes> for RawMessage {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

/// Status of a single platform as reported by the publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatus {
    /// Platform number
    pub platform: u32,

    /// Status name, forwarded as-is even when unknown
    pub status: String,

    /// Fields this relay does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlatformStatus {
    pub fn new(platform: u32, status: impl Into<String>) -> Self {
        Self {
            platform,
            status: status.into(),
            extra: Map::new(),
        }
    }

    /// Interpret the status, `None` if it is not one of the known values
    pub fn known_status(&self) -> Option<TrainStatus> {
        self.status.parse().ok()
    }
}

/// One decoded status broadcast
///
/// The `trains` field name is kept for compatibility with existing viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub trains: Vec<PlatformStatus>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusEvent {
    pub fn new(trains: Vec<PlatformStatus>) -> Self {
        Self {
            trains,
            extra: Map::new(),
        }
    }

    /// Number of platforms whose status is not a known value
    pub fn unknown_status_count(&self) -> usize {
        self.trains
            .iter()
            .filter(|t| t.known_status().is_none())
            .count()
    }
}

/// Known platform states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrainStatus {
    #[default]
    Idle,
    Arriving,
    Stopped,
    ReadyToDepart,
    Departing,
}

impl TrainStatus {
    pub const ALL: [TrainStatus; 5] = [
        TrainStatus::Idle,
        TrainStatus::Arriving,
        TrainStatus::Stopped,
        TrainStatus::ReadyToDepart,
        TrainStatus::Departing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrainStatus::Idle => "idle",
            TrainStatus::Arriving => "arriving",
            TrainStatus::Stopped => "stopped",
            TrainStatus::ReadyToDepart => "ready_to_depart",
            TrainStatus::Departing => "departing",
        }
    }
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrainStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown train status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_status_names() {
        for status in TrainStatus::ALL {
            assert_eq!(status.as_str().parse::<TrainStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        assert!("boarding".parse::<TrainStatus>().is_err());
    }

    #[test]
    fn test_unknown_status_is_kept() {
        let platform = PlatformStatus::new(3, "boarding");
        assert_eq!(platform.known_status(), None);
        assert_eq!(platform.status, "boarding");

        let event = StatusEvent::new(vec![platform, PlatformStatus::new(1, "idle")]);
        assert_eq!(event.unknown_status_count(), 1);
    }

    #[test]
    fn test_raw_message_lossy_text() {
        let raw = RawMessage::from(vec![b'o', b'k', 0xff]);
        assert_eq!(raw.len(), 3);
        assert_eq!(raw.to_text(), "ok\u{fffd}");
    }
}
