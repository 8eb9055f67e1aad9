//! Transport module - where transport units come from.
//!
//! Provides:
//! - [`TailTransport`]: opens a server-streamed feed for a ticket
//! - [`FlightTransport`]: Arrow Flight `DoGet` over a tonic channel
//! - [`MemoryTransport`]: channel-fed feeds for tests and embedding

mod flight;
mod memory;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::config::DEFAULT_SCHEME;
use crate::error::{LiveTailError, Result};
use crate::protocol::FlightUnit;

pub use flight::FlightTransport;
pub use memory::{MemoryTransport, UnitSender};

/// Units in arrival order. Ends when the server closes the feed.
pub type UnitStream = BoxStream<'static, Result<FlightUnit>>;

/// Streaming endpoint of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    /// URL scheme (`http` or `https`).
    pub scheme: String,
    /// Host name or address.
    pub host: String,
    /// RPC port.
    pub port: u16,
}

impl Target {
    /// Create a plain-text target.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            host: host.into(),
            port,
        }
    }

    /// Use a different URL scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Endpoint URL, e.g. `http://localhost:8815`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Check that the target can be connected to.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSessionRequest` for an empty host or port 0.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(LiveTailError::InvalidSessionRequest(
                "host must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(LiveTailError::InvalidSessionRequest(
                "port must not be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens live-tail feeds.
#[async_trait]
pub trait TailTransport: Send + Sync + 'static {
    /// Open the feed named by `ticket` on `target`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the endpoint is unreachable or rejects the
    /// request. Failures after the feed is open arrive as stream items.
    async fn open(&self, target: &Target, ticket: Bytes) -> Result<UnitStream>;
}
