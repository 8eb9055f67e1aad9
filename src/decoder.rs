//! Incremental batch decoder.
//!
//! [`BatchDecoder`] consumes the reassembled byte stream in arbitrary chunks
//! and yields decoded units as soon as each containing message is complete:
//!
//! 1. exactly one [`DecodedUnit::Schema`], first,
//! 2. then any number of [`DecodedUnit::Batch`] units,
//! 3. possibly interleaved with [`DecodedUnit::EndOfStream`].
//!
//! Dictionary messages are absorbed into the decoder and never surface.
//! After the first error the decoder is terminated and every later push fails.
//!
//! # Example
//!
//! ```ignore
//! use livetail_client::decoder::{BatchDecoder, DecodedUnit};
//!
//! let mut decoder = BatchDecoder::new();
//! for unit in decoder.push(&framed_bytes)? {
//!     match unit {
//!         DecodedUnit::Schema(schema) => println!("{} columns", schema.len()),
//!         DecodedUnit::Batch(rows) => println!("{} rows", rows.len()),
//!         DecodedUnit::EndOfStream => {}
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::ArrayRef;
use arrow_buffer::Buffer;
use arrow_ipc::reader::{read_dictionary, read_record_batch};
use arrow_ipc::MessageHeader;
use arrow_schema::SchemaRef;
use bytes::Bytes;

use crate::codec::{rows_from_batch, schema_from_arrow};
use crate::error::{LiveTailError, Result};
use crate::model::{Row, Schema};
use crate::protocol::{IpcMessage, MessageBuffer};
use crate::protocol::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_METADATA_SIZE};

/// One decoded unit of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedUnit {
    /// The session schema. Always the first unit.
    Schema(Schema),
    /// Rows of one record batch, in stream order. May be empty.
    Batch(Vec<Row>),
    /// End-of-stream marker.
    EndOfStream,
}

/// Decodes a framed message stream into a schema and row batches.
pub struct BatchDecoder {
    buffer: MessageBuffer,
    /// Wire schema, set by the first schema message.
    arrow_schema: Option<SchemaRef>,
    /// Session schema derived from `arrow_schema`.
    schema: Option<Schema>,
    dictionaries: HashMap<i64, ArrayRef>,
    terminated: bool,
    batches: u64,
    rows: u64,
}

impl BatchDecoder {
    /// Create a decoder with default message size limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_METADATA_SIZE, DEFAULT_MAX_BODY_SIZE)
    }

    /// Create a decoder with custom message size limits.
    pub fn with_limits(max_metadata_size: usize, max_body_size: usize) -> Self {
        Self {
            buffer: MessageBuffer::with_limits(max_metadata_size, max_body_size),
            arrow_schema: None,
            schema: None,
            dictionaries: HashMap::new(),
            terminated: false,
            batches: 0,
            rows: 0,
        }
    }

    /// Push stream bytes and return every unit completed by them.
    ///
    /// # Errors
    ///
    /// Returns a decode error for structurally invalid messages, a batch
    /// before the schema, or a schema change mid-session. The decoder is
    /// terminated afterwards.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<DecodedUnit>> {
        if self.terminated {
            return Err(LiveTailError::Decode(
                "Decoder terminated after an earlier error".to_string(),
            ));
        }

        match self.decode_available(data) {
            Ok(units) => Ok(units),
            Err(e) => {
                self.terminated = true;
                Err(e)
            }
        }
    }

    fn decode_available(&mut self, data: &[u8]) -> Result<Vec<DecodedUnit>> {
        let messages = self.buffer.push(data)?;
        let mut units = Vec::with_capacity(messages.len());

        for message in messages {
            match message {
                IpcMessage::EndOfStream => units.push(DecodedUnit::EndOfStream),
                IpcMessage::Message { metadata, body } => {
                    if let Some(unit) = self.decode_message(&metadata, body)? {
                        units.push(unit);
                    }
                }
            }
        }

        Ok(units)
    }

    fn decode_message(&mut self, metadata: &[u8], body: Bytes) -> Result<Option<DecodedUnit>> {
        let message = arrow_ipc::root_as_message(metadata)
            .map_err(|e| LiveTailError::Decode(format!("Invalid message metadata: {}", e)))?;

        match message.header_type() {
            MessageHeader::Schema => {
                let fb_schema = message
                    .header_as_schema()
                    .ok_or_else(|| LiveTailError::Decode("Schema message without schema".into()))?;
                let arrow_schema = Arc::new(arrow_ipc::convert::fb_to_schema(fb_schema));
                self.install_schema(arrow_schema)
            }

            MessageHeader::DictionaryBatch => {
                let arrow_schema = self.require_schema("Dictionary batch")?;
                let batch = message.header_as_dictionary_batch().ok_or_else(|| {
                    LiveTailError::Decode("Dictionary message without batch".into())
                })?;
                read_dictionary(
                    &Buffer::from(body),
                    batch,
                    &arrow_schema,
                    &mut self.dictionaries,
                    &message.version(),
                )?;
                Ok(None)
            }

            MessageHeader::RecordBatch => {
                let arrow_schema = self.require_schema("Record batch")?;
                let batch = message.header_as_record_batch().ok_or_else(|| {
                    LiveTailError::Decode("Record batch message without batch".into())
                })?;
                let record_batch = read_record_batch(
                    &Buffer::from(body),
                    batch,
                    arrow_schema,
                    &self.dictionaries,
                    None,
                    &message.version(),
                )?;

                let rows = match &self.schema {
                    Some(schema) => rows_from_batch(&record_batch, schema),
                    None => Vec::new(),
                };
                self.batches += 1;
                self.rows += rows.len() as u64;
                Ok(Some(DecodedUnit::Batch(rows)))
            }

            other => {
                tracing::warn!("Skipping unsupported message type {:?}", other);
                Ok(None)
            }
        }
    }

    fn install_schema(&mut self, arrow_schema: SchemaRef) -> Result<Option<DecodedUnit>> {
        if let Some(current) = &self.arrow_schema {
            if current.fields() == arrow_schema.fields() {
                tracing::debug!("Ignoring repeated schema message");
                return Ok(None);
            }
            return Err(LiveTailError::Decode(format!(
                "Schema mismatch: stream changed schema from {:?} to {:?}",
                field_names(current),
                field_names(&arrow_schema)
            )));
        }

        let schema = schema_from_arrow(&arrow_schema);
        self.arrow_schema = Some(arrow_schema);
        self.schema = Some(schema.clone());
        Ok(Some(DecodedUnit::Schema(schema)))
    }

    fn require_schema(&self, what: &str) -> Result<SchemaRef> {
        self.arrow_schema
            .clone()
            .ok_or_else(|| LiveTailError::Decode(format!("{} received before schema", what)))
    }

    /// The established schema, if one has been decoded.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Check whether an error has terminated this decoder.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Check whether a partially received message is pending.
    pub fn has_partial(&self) -> bool {
        self.buffer.has_partial()
    }

    /// Number of record batches decoded.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Number of rows decoded.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl Default for BatchDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn field_names(schema: &SchemaRef) -> Vec<&str> {
    schema.fields().iter().map(|f| f.name().as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::model::{ColumnType, Value};
    use crate::protocol::{FrameReassembler, END_OF_STREAM};

    fn decode_all(decoder: &mut BatchDecoder, bytes: &[u8]) -> Vec<DecodedUnit> {
        decoder.push(bytes).unwrap()
    }

    #[test]
    fn test_schema_then_batches() {
        let bytes = fixtures::ipc_stream(&[&["one", "two"], &["three"]]);
        let mut decoder = BatchDecoder::new();

        let units = decode_all(&mut decoder, &bytes);

        assert_eq!(units.len(), 4);
        let DecodedUnit::Schema(schema) = &units[0] else {
            panic!("first unit must be the schema, got {:?}", units[0]);
        };
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.columns()[0].column_type, ColumnType::Timestamp);
        assert_eq!(schema.columns()[2].name, "message");

        let DecodedUnit::Batch(rows) = &units[1] else {
            panic!("expected batch");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("message"), Some(&Value::Utf8("two".to_string())));

        assert!(matches!(&units[2], DecodedUnit::Batch(rows) if rows.len() == 1));
        assert_eq!(units[3], DecodedUnit::EndOfStream);
        assert_eq!(decoder.batches(), 2);
        assert_eq!(decoder.rows(), 3);
    }

    #[test]
    fn test_rows_available_before_stream_ends() {
        let bytes = fixtures::ipc_stream(&[&["early"], &["late"]]);
        let mut decoder = BatchDecoder::new();

        // Feed everything but the last batch and the end marker
        let units = fixtures::ipc_messages(&bytes);
        let first_two: usize = units[..2].iter().map(Vec::len).sum();

        let decoded = decode_all(&mut decoder, &bytes[..first_two]);
        assert_eq!(decoded.len(), 2);
        assert!(matches!(&decoded[1], DecodedUnit::Batch(rows) if rows.len() == 1));
        assert!(!decoder.has_partial());
    }

    #[test]
    fn test_chunked_feed_matches_whole_feed() {
        let bytes = fixtures::ipc_stream(&[&["a", "b", "c"], &["d"], &[]]);

        let whole = decode_all(&mut BatchDecoder::new(), &bytes);

        let mut decoder = BatchDecoder::new();
        let mut chunked = Vec::new();
        for chunk in bytes.chunks(7) {
            chunked.extend(decode_all(&mut decoder, chunk));
        }

        assert_eq!(whole, chunked);
        assert!(matches!(&chunked[3], DecodedUnit::Batch(rows) if rows.is_empty()));
    }

    #[test]
    fn test_reassembled_flight_units() {
        let units = fixtures::flight_units(&[&["from flight"], &["second", "third"]]);
        let mut reassembler = FrameReassembler::new();
        let mut decoder = BatchDecoder::new();

        let mut decoded = Vec::new();
        for unit in &units {
            let framed = reassembler.push(unit).unwrap();
            decoded.extend(decode_all(&mut decoder, &framed));
        }

        assert_eq!(decoded.len(), 3);
        assert!(matches!(&decoded[0], DecodedUnit::Schema(_)));
        assert!(matches!(&decoded[2], DecodedUnit::Batch(rows) if rows.len() == 2));
    }

    #[test]
    fn test_dictionary_encoded_column() {
        let units = fixtures::dictionary_flight_units(&["info", "error", "info"]);
        let mut reassembler = FrameReassembler::new();
        let mut decoder = BatchDecoder::new();

        let mut rows = Vec::new();
        for unit in &units {
            let framed = reassembler.push(unit).unwrap();
            for decoded in decode_all(&mut decoder, &framed) {
                if let DecodedUnit::Batch(batch) = decoded {
                    rows.extend(batch);
                }
            }
        }

        assert_eq!(decoder.schema().unwrap().columns()[0].column_type, ColumnType::Utf8);
        let levels: Vec<_> = rows.iter().map(|r| r.get("level").cloned()).collect();
        assert_eq!(
            levels,
            vec![
                Some(Value::Utf8("info".to_string())),
                Some(Value::Utf8("error".to_string())),
                Some(Value::Utf8("info".to_string())),
            ]
        );
    }

    #[test]
    fn test_batch_before_schema_is_error() {
        let bytes = fixtures::ipc_stream(&[&["orphan"]]);
        let messages = fixtures::ipc_messages(&bytes);

        let mut decoder = BatchDecoder::new();
        let err = decoder.push(&messages[1]).unwrap_err();

        assert!(matches!(err, LiveTailError::Decode(_)));
        assert!(err.to_string().contains("before schema"));
        assert!(decoder.is_terminated());
    }

    #[test]
    fn test_terminated_after_error() {
        let mut decoder = BatchDecoder::new();
        assert!(decoder.push(&[1, 2, 3, 4, 5, 6, 7, 8]).is_err());

        // Even a valid stream is refused now
        let bytes = fixtures::ipc_stream(&[&["x"]]);
        let err = decoder.push(&bytes).unwrap_err();
        assert!(err.to_string().contains("terminated"));
    }

    #[test]
    fn test_truncated_body_is_error() {
        let bytes = fixtures::ipc_stream(&[&["will be cut"]]);
        let messages = fixtures::ipc_messages(&bytes);

        // Schema, a batch missing its last 8 body bytes, then a full batch.
        // The short body swallows the next prefix, so the stream desyncs.
        let mut corrupted = messages[0].clone();
        let batch = &messages[1];
        corrupted.extend_from_slice(&batch[..batch.len() - 8]);
        corrupted.extend_from_slice(batch);
        corrupted.extend_from_slice(&END_OF_STREAM);

        let mut decoder = BatchDecoder::new();
        let result = decoder.push(&corrupted);
        assert!(matches!(result, Err(LiveTailError::Decode(_))));
    }

    #[test]
    fn test_end_of_stream_interleaved() {
        let bytes = fixtures::ipc_stream(&[&["before"]]);
        let messages = fixtures::ipc_messages(&bytes);

        let mut stream = bytes.clone();
        // Same schema again, then one more batch
        stream.extend_from_slice(&messages[0]);
        stream.extend_from_slice(&messages[1]);

        let units = decode_all(&mut BatchDecoder::new(), &stream);

        // schema, batch, eos, (repeated schema ignored), batch
        assert_eq!(units.len(), 4);
        assert_eq!(units[2], DecodedUnit::EndOfStream);
        assert!(matches!(&units[3], DecodedUnit::Batch(rows) if rows.len() == 1));
    }

    #[test]
    fn test_schema_change_is_error() {
        let first = fixtures::ipc_stream(&[&["a"]]);
        let other = fixtures::other_schema_stream();

        let mut decoder = BatchDecoder::new();
        decoder.push(&first).unwrap();

        let err = decoder.push(&other).unwrap_err();
        assert!(err.to_string().contains("Schema mismatch"));
    }
}
