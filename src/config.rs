//! Session configuration.
//!
//! All fields have defaults, so a partial JSON document is enough:
//!
//! ```
//! use livetail_client::LiveTailConfig;
//!
//! let config = LiveTailConfig::from_json(r#"{ "capacity": 500 }"#).unwrap();
//! assert_eq!(config.capacity, 500);
//! assert_eq!(config.host, "localhost");
//! ```

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_METADATA_SIZE};
use crate::window::DEFAULT_CAPACITY;

/// Default host used by `SessionController::start`.
pub const DEFAULT_HOST: &str = "localhost";

/// Default URL scheme for the streaming channel.
pub const DEFAULT_SCHEME: &str = "http";

/// Configuration for a live-tail session controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LiveTailConfig {
    /// Rows kept in the bounded window.
    pub capacity: usize,
    /// Host used when only a port is given.
    pub host: String,
    /// URL scheme for the channel (`http` or `https`).
    pub scheme: String,
    /// Largest accepted message header, in bytes.
    pub max_metadata_size: usize,
    /// Largest accepted message body, in bytes.
    pub max_body_size: usize,
}

impl LiveTailConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid JSON or a field has the
    /// wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for LiveTailConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            host: DEFAULT_HOST.to_string(),
            scheme: DEFAULT_SCHEME.to_string(),
            max_metadata_size: DEFAULT_MAX_METADATA_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}
