//! Frame reassembler: transport units in, framed byte stream out.
//!
//! The transport delivers each message split into a header and a body. The
//! decoder wants one contiguous stream in which every message carries its own
//! prefix and alignment padding. [`FrameReassembler`] produces that stream one
//! unit at a time, in arrival order, without buffering anything itself.
//!
//! # Example
//!
//! ```
//! use livetail_client::protocol::{FlightUnit, FrameReassembler};
//!
//! let mut reassembler = FrameReassembler::new();
//! let unit = FlightUnit::from_parts(&[1u8; 8], b"body");
//! let framed = reassembler.push(&unit).unwrap();
//! assert_eq!(&framed[..4], &[0xFF; 4]);
//!
//! // An empty header is a framing error and stops the reassembler.
//! assert!(reassembler.push(&FlightUnit::default()).is_err());
//! assert!(reassembler.push(&unit).is_err());
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::frame::{build_prefix, FlightUnit};
use super::wire_format::{padding_for, DEFAULT_MAX_METADATA_SIZE, MIN_METADATA_SIZE};
use crate::error::{LiveTailError, Result};

/// Turns transport units into a contiguous, correctly framed byte stream.
///
/// One instance per session. After the first framing error the reassembler
/// refuses all further units; a new session needs a new instance.
#[derive(Debug)]
pub struct FrameReassembler {
    /// Largest header accepted.
    max_metadata_size: usize,
    /// Set after the first framing error.
    failed: bool,
    /// Units framed so far.
    units: u64,
    /// Bytes emitted so far.
    bytes_emitted: u64,
}

impl FrameReassembler {
    /// Create a reassembler with the default header size limit.
    pub fn new() -> Self {
        Self::with_max_metadata(DEFAULT_MAX_METADATA_SIZE)
    }

    /// Create a reassembler with a custom header size limit.
    pub fn with_max_metadata(max_metadata_size: usize) -> Self {
        Self {
            max_metadata_size: max_metadata_size.min(i32::MAX as usize),
            failed: false,
            units: 0,
            bytes_emitted: 0,
        }
    }

    /// Frame one unit and return the bytes to append to the stream.
    ///
    /// Out-of-band `app_metadata` is not part of the message stream and is
    /// dropped here.
    ///
    /// # Errors
    ///
    /// Returns a framing error if the header is shorter than the minimum
    /// message size or larger than the configured limit, or if an earlier
    /// unit already failed.
    pub fn push(&mut self, unit: &FlightUnit) -> Result<Bytes> {
        if self.failed {
            return Err(LiveTailError::Framing(
                "Reassembler stopped after an earlier framing error".to_string(),
            ));
        }

        if let Err(e) = self.validate(unit) {
            self.failed = true;
            return Err(e);
        }

        if !unit.app_metadata.is_empty() {
            tracing::trace!(
                "Ignoring {} bytes of app metadata on unit {}",
                unit.app_metadata.len(),
                self.units
            );
        }

        let mut buf = BytesMut::with_capacity(unit.framed_len());
        buf.put_slice(&build_prefix(unit.header.len()));
        buf.put_slice(&unit.header);
        buf.put_bytes(0, padding_for(unit.header.len()));
        buf.put_slice(&unit.body);

        self.units += 1;
        self.bytes_emitted += buf.len() as u64;

        Ok(buf.freeze())
    }

    fn validate(&self, unit: &FlightUnit) -> Result<()> {
        let len = unit.header.len();

        if len < MIN_METADATA_SIZE {
            return Err(LiveTailError::Framing(format!(
                "Unit {} header is {} bytes, minimum message size is {}",
                self.units, len, MIN_METADATA_SIZE
            )));
        }

        if len + padding_for(len) > self.max_metadata_size {
            return Err(LiveTailError::Framing(format!(
                "Unit {} header size {} exceeds maximum {}",
                self.units, len, self.max_metadata_size
            )));
        }

        Ok(())
    }

    /// Number of units framed so far.
    pub fn units(&self) -> u64 {
        self.units
    }

    /// Number of bytes emitted so far.
    pub fn bytes_emitted(&self) -> u64 {
        self.bytes_emitted
    }

    /// Check whether a framing error has stopped this reassembler.
    pub fn is_failed(&self) -> bool {
        self.failed
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}
