//! Transport units and message building.
//!
//! A [`FlightUnit`] is what the streaming endpoint hands us: a header
//! (message metadata), a body, and optional out-of-band application bytes.
//! Uses `bytes::Bytes` so units can be sliced and shared without copying.
//!
//! # Example
//!
//! ```
//! use livetail_client::protocol::{build_message, FlightUnit, PREFIX_SIZE};
//! use bytes::Bytes;
//!
//! let unit = FlightUnit::new(Bytes::from_static(&[1u8; 8]), Bytes::from_static(b"body"));
//! let message = build_message(&unit.header, &unit.body);
//! assert_eq!(message.len(), PREFIX_SIZE + 8 + 4);
//! ```

use arrow_flight::FlightData;
use bytes::Bytes;

use super::wire_format::{padding_for, MessagePrefix, PREFIX_SIZE};

/// One unit delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightUnit {
    /// Message metadata (an IPC `Message` flatbuffer).
    pub header: Bytes,
    /// Message body.
    pub body: Bytes,
    /// Out-of-band application bytes. Not part of the message stream.
    pub app_metadata: Bytes,
}

impl FlightUnit {
    /// Create a unit from header and body.
    pub fn new(header: Bytes, body: Bytes) -> Self {
        Self {
            header,
            body,
            app_metadata: Bytes::new(),
        }
    }

    /// Create a unit from raw slices (copies data).
    pub fn from_parts(header: &[u8], body: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(header), Bytes::copy_from_slice(body))
    }

    /// Attach out-of-band application bytes.
    pub fn with_app_metadata(mut self, app_metadata: Bytes) -> Self {
        self.app_metadata = app_metadata;
        self
    }

    /// Size of this unit once framed.
    #[inline]
    pub fn framed_len(&self) -> usize {
        PREFIX_SIZE + self.header.len() + padding_for(self.header.len()) + self.body.len()
    }
}

impl From<FlightData> for FlightUnit {
    fn from(data: FlightData) -> Self {
        Self {
            header: data.data_header,
            body: data.data_body,
            app_metadata: data.app_metadata,
        }
    }
}

/// Build a complete framed message as a single byte vector.
///
/// Writes the prefix, the header, zero padding up to the alignment boundary,
/// then the body. Header validation is the reassembler's job.
pub fn build_message(header: &[u8], body: &[u8]) -> Vec<u8> {
    let padding = padding_for(header.len());
    let mut buf = Vec::with_capacity(PREFIX_SIZE + header.len() + padding + body.len());
    buf.extend_from_slice(&build_prefix(header.len()));
    buf.extend_from_slice(header);
    buf.resize(buf.len() + padding, 0);
    buf.extend_from_slice(body);
    buf
}

/// Encode the prefix for a header of `header_len` unpadded bytes.
pub fn build_prefix(header_len: usize) -> [u8; PREFIX_SIZE] {
    let padded = header_len + padding_for(header_len);
    MessagePrefix::new(padded as u32).encode()
}
