//! Protocol module - message framing between transport units and the decoder.
//!
//! This module implements the byte level of the live-tail feed:
//! - 8-byte message prefix (continuation marker + metadata length)
//! - Reassembly of transport units into one framed byte stream
//! - Message buffer for splitting partial reads back into messages

mod frame;
mod frame_buffer;
mod reassembler;
mod wire_format;

pub use frame::{build_message, build_prefix, FlightUnit};
pub use frame_buffer::{IpcMessage, MessageBuffer};
pub use reassembler::FrameReassembler;
pub use wire_format::{
    padded_metadata_len, padding_for, MessagePrefix, ALIGNMENT, CONTINUATION_MARKER,
    DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_METADATA_SIZE, END_OF_STREAM, MARKER_SIZE,
    MIN_METADATA_SIZE, PREFIX_SIZE,
};
