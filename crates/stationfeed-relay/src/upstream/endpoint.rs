//! Upstream endpoint validation

use stationfeed_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A validated pub/sub endpoint such as `tcp://localhost:5556`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamEndpoint(String);

impl UpstreamEndpoint {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(addr) = s.strip_prefix("tcp://") {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| Error::config(format!("endpoint '{}' has no port", s)))?;
            if host.is_empty() {
                return Err(Error::config(format!("endpoint '{}' has no host", s)));
            }
            port.parse::<u16>()
                .map_err(|_| Error::config(format!("endpoint '{}' has an invalid port", s)))?;
            Ok(Self(s.to_string()))
        } else if let Some(path) = s.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(Error::config(format!("endpoint '{}' has no path", s)));
            }
            Ok(Self(s.to_string()))
        } else {
            Err(Error::config(format!(
                "unsupported endpoint '{}', expected tcp://host:port or ipc://path",
                s
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UpstreamEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_endpoints() {
        for s in ["tcp://localhost:5556", "tcp://127.0.0.1:1", "ipc:///tmp/feed.sock"] {
            assert_eq!(UpstreamEndpoint::parse(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_invalid_endpoints() {
        for s in ["localhost:5556", "tcp://localhost", "tcp://:5556", "tcp://host:99999", "ipc://", ""] {
            let err = UpstreamEndpoint::parse(s).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{}", s);
        }
    }
}
