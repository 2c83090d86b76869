//! Backend connection strings.
//!
//! - `tcp://host:port` connects to a generation service over TCP.
//! - `synthetic://<seed>` uses the built-in [`SyntheticBackend`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::GenerationBackend;
use crate::error::BackendError;
use crate::synthetic::SyntheticBackend;
use crate::tcp::TcpBackend;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Synthetic { seed: u64 },
}

impl Endpoint {
    /// Build the backend this endpoint names. Nothing is contacted yet.
    pub fn backend(&self) -> Arc<dyn GenerationBackend> {
        match self {
            Self::Tcp { host, port } => Arc::new(TcpBackend::new(format!("{host}:{port}"))),
            Self::Synthetic { seed } => Arc::new(SyntheticBackend::new(*seed)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Synthetic { seed } => write!(f, "synthetic://{seed}"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| BackendError::InvalidEndpoint {
            endpoint: s.to_string(),
            reason: reason.to_string(),
        };
        let (scheme, rest) = s
            .trim()
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;

        match scheme {
            "tcp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("expected host:port"))?;
                if host.is_empty() {
                    return Err(invalid("empty host"));
                }
                let port = port.parse().map_err(|_| invalid("invalid port"))?;
                Ok(Self::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            "synthetic" => {
                let seed = if rest.is_empty() {
                    0
                } else {
                    rest.parse().map_err(|_| invalid("seed must be an integer"))?
                };
                Ok(Self::Synthetic { seed })
            }
            other => Err(invalid(&format!("unsupported scheme {other:?}"))),
        }
    }
}

impl TryFrom<String> for Endpoint {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}
