//! Wire format of the reassembled message stream.
//!
//! Every message on the stream is laid out as:
//! ```text
//! ┌──────────────┬──────────────┬─────────────────────┬──────────┐
//! │ Continuation │ Metadata len │ Metadata (header)   │ Body     │
//! │ 0xFFFFFFFF   │ int32 LE     │ padded to 8 bytes   │ N bytes  │
//! └──────────────┴──────────────┴─────────────────────┴──────────┘
//! ```
//!
//! A metadata length of zero following the marker is an end-of-stream marker.
//! The body length is not part of the prefix; it is read from the header.

use crate::error::{LiveTailError, Result};

/// Continuation marker that introduces every message.
pub const CONTINUATION_MARKER: u32 = 0xFFFF_FFFF;

/// Size of the continuation marker in bytes.
pub const MARKER_SIZE: usize = 4;

/// Size of the full prefix (marker + metadata length).
pub const PREFIX_SIZE: usize = 8;

/// Alignment of the prefix + metadata block. Bodies start on this boundary.
pub const ALIGNMENT: usize = 8;

/// Smallest header that can hold a message flatbuffer.
pub const MIN_METADATA_SIZE: usize = 8;

/// Default maximum header size (64 MB).
pub const DEFAULT_MAX_METADATA_SIZE: usize = 64 * 1024 * 1024;

/// Default maximum body size (1 GB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1_073_741_824;

/// End-of-stream marker: continuation followed by a zero length.
pub const END_OF_STREAM: [u8; PREFIX_SIZE] = [0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0];

/// Decoded message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePrefix {
    /// Length of the metadata block that follows, padding included.
    pub metadata_length: u32,
}

impl MessagePrefix {
    /// Create a prefix for a metadata block of the given (padded) length.
    pub fn new(metadata_length: u32) -> Self {
        Self { metadata_length }
    }

    /// Encode the prefix (marker + little-endian length).
    ///
    /// # Example
    ///
    /// ```
    /// use livetail_client::protocol::MessagePrefix;
    ///
    /// let bytes = MessagePrefix::new(16).encode();
    /// assert_eq!(bytes, [0xFF, 0xFF, 0xFF, 0xFF, 16, 0, 0, 0]);
    /// ```
    pub fn encode(&self) -> [u8; PREFIX_SIZE] {
        let mut buf = [0u8; PREFIX_SIZE];
        buf[..MARKER_SIZE].copy_from_slice(&CONTINUATION_MARKER.to_le_bytes());
        buf[MARKER_SIZE..].copy_from_slice(&self.metadata_length.to_le_bytes());
        buf
    }

    /// Decode a prefix from the first 8 bytes of `buf`.
    ///
    /// Returns `Ok(None)` if fewer than 8 bytes are available.
    ///
    /// # Errors
    ///
    /// Fails when the marker is wrong or the length is negative as an int32.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < PREFIX_SIZE {
            return Ok(None);
        }

        let (marker, length) = buf[..PREFIX_SIZE].split_at(MARKER_SIZE);
        let marker = u32::from_le_bytes([marker[0], marker[1], marker[2], marker[3]]);
        if marker != CONTINUATION_MARKER {
            return Err(LiveTailError::Decode(format!(
                "Marker mismatch: expected 0x{:08X}, got 0x{:08X}",
                CONTINUATION_MARKER, marker
            )));
        }

        let length = i32::from_le_bytes([length[0], length[1], length[2], length[3]]);
        if length < 0 {
            return Err(LiveTailError::Decode(format!(
                "Bad metadata length {}",
                length
            )));
        }

        Ok(Some(Self {
            metadata_length: length as u32,
        }))
    }

    /// Check if this prefix is an end-of-stream marker.
    #[inline]
    pub fn is_end_of_stream(&self) -> bool {
        self.metadata_length == 0
    }
}

/// Number of zero bytes that must follow a header of `metadata_len` bytes.
#[inline]
pub fn padding_for(metadata_len: usize) -> usize {
    let unaligned = (PREFIX_SIZE + metadata_len) % ALIGNMENT;
    if unaligned == 0 {
        0
    } else {
        ALIGNMENT - unaligned
    }
}

/// Padded metadata length as written into the prefix.
#[inline]
pub fn padded_metadata_len(metadata_len: usize) -> usize {
    metadata_len + padding_for(metadata_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_little_endian_layout() {
        let bytes = MessagePrefix::new(0x0102_0304).encode();
        assert_eq!(&bytes[..4], &[0xFF; 4]);
        assert_eq!(&bytes[4..], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_decode_short_buffer_needs_more() {
        let bytes = MessagePrefix::new(8).encode();
        assert!(MessagePrefix::decode(&bytes[..7]).unwrap().is_none());
    }

    #[test]
    fn test_decode_marker_mismatch() {
        let bytes = [0x10, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        let err = MessagePrefix::decode(&bytes).unwrap_err();
        assert!(matches!(err, LiveTailError::Decode(_)));
        assert!(err.to_string().contains("Marker mismatch"));
    }

    #[test]
    fn test_decode_negative_length_rejected() {
        let mut bytes = [0xFFu8; PREFIX_SIZE];
        bytes[7] = 0x80; // i32::MIN territory
        let err = MessagePrefix::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("Bad metadata length"));
    }

    #[test]
    fn test_end_of_stream_constant() {
        let prefix = MessagePrefix::decode(&END_OF_STREAM).unwrap().unwrap();
        assert!(prefix.is_end_of_stream());
    }

    #[test]
    fn test_padding_keeps_body_aligned() {
        for len in 0..40 {
            let padded = padded_metadata_len(len);
            assert!(padded >= len);
            assert_eq!((PREFIX_SIZE + padded) % ALIGNMENT, 0);
            assert!(padded - len < ALIGNMENT);
        }
    }
}
