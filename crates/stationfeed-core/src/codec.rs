//! Decoding of upstream messages and the outbound wire form
//!
//! A message that does not match the status shape is never dropped: the
//! failure keeps the original bytes so they can be forwarded verbatim.

use crate::error::Result;
use crate::types::{RawMessage, StatusEvent};

/// An upstream message that could not be decoded
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed status payload: {reason}")]
pub struct DecodeFailure {
    /// The bytes exactly as received
    pub raw: RawMessage,

    /// Parser diagnostic
    pub reason: String,
}

/// Decode raw upstream bytes into a status event
pub fn decode(raw: RawMessage) -> std::result::Result<StatusEvent, DecodeFailure> {
    match serde_json::from_slice::<StatusEvent>(raw.as_bytes()) {
        Ok(event) => Ok(event),
        Err(e) => Err(DecodeFailure {
            raw,
            reason: e.to_string(),
        }),
    }
}

/// What gets broadcast for one upstream message
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Successfully decoded, re-serialized canonically on the wire
    Status(StatusEvent),

    /// Undecodable, forwarded verbatim
    Raw(RawMessage),
}

impl Payload {
    /// Render the text frame sent to viewers
    pub fn to_wire(&self) -> Result<String> {
        match self {
            Payload::Status(event) => Ok(serde_json::to_string(event)?),
            Payload::Raw(raw) => Ok(raw.to_text().into_owned()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Payload::Raw(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Status(_) => "status",
            Payload::Raw(_) => "fallback",
        }
    }
}

impl From<std::result::Result<StatusEvent, DecodeFailure>> for Payload {
    fn from(decoded: std::result::Result<StatusEvent, DecodeFailure>) -> Self {
        match decoded {
            Ok(event) => Payload::Status(event),
            Err(failure) => Payload::Raw(failure.raw),
        }
    }
}

impl From<StatusEvent> for Payload {
    fn from(event: StatusEvent) -> Self {
        Payload::Status(event)
    }
}
