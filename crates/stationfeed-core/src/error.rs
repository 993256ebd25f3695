//! Error types for stationfeed

/// Result type alias using stationfeed's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for stationfeed operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream feed could not be reached
    #[error("upstream connection error ({endpoint}): {reason}")]
    Connection { endpoint: String, reason: String },

    /// Sending to a viewer failed at the transport level
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new upstream connection error
    pub fn connection(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create a new delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
