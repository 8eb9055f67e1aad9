//! Message buffer for accumulating the reassembled stream.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling messages split across chunks:
//! - `WaitingForPrefix`: Need at least 8 bytes (marker + metadata length)
//! - `WaitingForMetadata`: Prefix parsed, need N metadata bytes
//! - `WaitingForBody`: Metadata parsed, need `bodyLength` more bytes
//!
//! The body length lives inside the metadata (`Message.bodyLength`), so the
//! metadata flatbuffer is verified here before any body bytes are awaited.
//!
//! # Example
//!
//! ```ignore
//! use livetail_client::protocol::MessageBuffer;
//!
//! let mut buffer = MessageBuffer::new();
//!
//! // Bytes arrive in arbitrary chunks from the reassembler
//! for message in buffer.push(&chunk)? {
//!     println!("{:?}", message);
//! }
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{
    MessagePrefix, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_METADATA_SIZE, PREFIX_SIZE,
};
use crate::error::{LiveTailError, Result};

/// A complete message cut out of the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcMessage {
    /// A message with verified metadata and its full body.
    Message {
        /// Metadata bytes, padding included.
        metadata: Bytes,
        /// Body bytes (exactly `bodyLength`).
        body: Bytes,
    },
    /// Continuation marker followed by a zero length.
    EndOfStream,
}

/// State machine for message parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for the 8-byte prefix.
    WaitingForPrefix,
    /// Prefix parsed, waiting for metadata bytes.
    WaitingForMetadata { length: usize },
    /// Metadata parsed, waiting for body bytes.
    WaitingForBody { metadata: Bytes, remaining: usize },
}

/// Buffer for accumulating stream bytes and extracting complete messages.
///
/// All data is stored in a single `BytesMut` buffer; messages are split off
/// the front and frozen, so extracted slices never copy.
pub struct MessageBuffer {
    /// Accumulated stream bytes.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed metadata size.
    max_metadata_size: usize,
    /// Maximum allowed body size.
    max_body_size: usize,
}

impl MessageBuffer {
    /// Create a new message buffer with default limits.
    ///
    /// Default capacity: 64KB, max metadata: 64MB, max body: 1GB.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_METADATA_SIZE, DEFAULT_MAX_BODY_SIZE)
    }

    /// Create a new message buffer with custom size limits.
    pub fn with_limits(max_metadata_size: usize, max_body_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForPrefix,
            max_metadata_size,
            max_body_size,
        }
    }

    /// Push stream bytes into the buffer and extract all complete messages.
    ///
    /// Partial messages are kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns a decode error on marker mismatch, bad lengths, or metadata
    /// that is not a valid message flatbuffer.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<IpcMessage>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();

        while let Some(message) = self.try_extract_one()? {
            messages.push(message);
        }

        Ok(messages)
    }

    /// Try to extract a single message from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<IpcMessage>> {
        match &self.state {
            State::WaitingForPrefix => {
                let prefix = match MessagePrefix::decode(&self.buffer)? {
                    Some(prefix) => prefix,
                    None => return Ok(None),
                };

                let _ = self.buffer.split_to(PREFIX_SIZE);

                if prefix.is_end_of_stream() {
                    return Ok(Some(IpcMessage::EndOfStream));
                }

                let length = prefix.metadata_length as usize;
                if length > self.max_metadata_size {
                    return Err(LiveTailError::Decode(format!(
                        "Metadata size {} exceeds maximum {}",
                        length, self.max_metadata_size
                    )));
                }

                self.state = State::WaitingForMetadata { length };
                self.try_extract_one()
            }

            State::WaitingForMetadata { length } => {
                let length = *length;
                if self.buffer.len() < length {
                    return Ok(None);
                }

                let metadata = self.buffer.split_to(length).freeze();
                let body_length = self.body_length(&metadata)?;

                if body_length == 0 {
                    self.state = State::WaitingForPrefix;
                    return Ok(Some(IpcMessage::Message {
                        metadata,
                        body: Bytes::new(),
                    }));
                }

                self.state = State::WaitingForBody {
                    metadata,
                    remaining: body_length,
                };
                self.try_extract_one()
            }

            State::WaitingForBody {
                metadata,
                remaining,
            } => {
                let remaining = *remaining;
                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let metadata = metadata.clone();
                let body = self.buffer.split_to(remaining).freeze();
                self.state = State::WaitingForPrefix;

                Ok(Some(IpcMessage::Message { metadata, body }))
            }
        }
    }

    /// Read and validate `bodyLength` from a metadata block.
    fn body_length(&self, metadata: &[u8]) -> Result<usize> {
        let message = arrow_ipc::root_as_message(metadata)
            .map_err(|e| LiveTailError::Decode(format!("Invalid message metadata: {}", e)))?;

        let body_length = message.bodyLength();
        if body_length < 0 {
            return Err(LiveTailError::Decode(format!(
                "Bad body length {}",
                body_length
            )));
        }

        let body_length = body_length as usize;
        if body_length > self.max_body_size {
            return Err(LiveTailError::Decode(format!(
                "Body size {} exceeds maximum {}",
                body_length, self.max_body_size
            )));
        }

        Ok(body_length)
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Check whether a partially received message is pending.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty() || !matches!(self.state, State::WaitingForPrefix)
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForPrefix;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForPrefix => "WaitingForPrefix",
            State::WaitingForMetadata { .. } => "WaitingForMetadata",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}
