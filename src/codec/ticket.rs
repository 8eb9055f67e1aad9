//! Ticket codec - the request payload that opens a live-tail feed.
//!
//! The ticket is a UTF-8 JSON object naming the stream:
//!
//! ```json
//! { "stream": "app-logs" }
//! ```
//!
//! # Example
//!
//! ```
//! use livetail_client::codec::TicketCodec;
//!
//! let ticket = TicketCodec::encode("app-logs").unwrap();
//! assert_eq!(&ticket[..], br#"{"stream":"app-logs"}"#);
//! assert_eq!(TicketCodec::decode(&ticket).unwrap(), "app-logs");
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Wire shape of the ticket payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailTicket {
    /// Name of the log stream to tail.
    pub stream: String,
}

/// JSON codec for tail tickets.
pub struct TicketCodec;

impl TicketCodec {
    /// Encode a ticket for the given stream name.
    ///
    /// # Errors
    ///
    /// Returns error if the ticket cannot be serialized.
    #[inline]
    pub fn encode(stream: &str) -> Result<Bytes> {
        let ticket = TailTicket {
            stream: stream.to_string(),
        };
        Ok(Bytes::from(serde_json::to_vec(&ticket)?))
    }

    /// Decode a ticket and return the stream name.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a JSON ticket.
    #[inline]
    pub fn decode(bytes: &[u8]) -> Result<String> {
        let ticket: TailTicket = serde_json::from_slice(bytes)?;
        Ok(ticket.stream)
    }
}
