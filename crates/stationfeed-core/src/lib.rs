//! Stationfeed Core
//!
//! Types and decoding shared by the stationfeed relay components.
//!
//! This crate provides:
//! - The platform status data model carried on the wire
//! - Decoding of raw upstream bytes with a verbatim fallback
//! - Error types and result handling

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{decode, DecodeFailure, Payload};
pub use error::{Error, Result};
pub use types::{PlatformStatus, RawMessage, StatusEvent, TrainStatus};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::codec::{decode, DecodeFailure, Payload};
    pub use crate::error::{Error, Result};
    pub use crate::types::{PlatformStatus, RawMessage, StatusEvent, TrainStatus};
}
