//! Shared test fixtures: log-shaped Arrow streams and rows.

use std::sync::Arc;

use arrow_array::types::Int32Type;
use arrow_array::{ArrayRef, DictionaryArray, Int64Array, RecordBatch, StringArray, TimestampMillisecondArray};
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{DataType, Field, Schema as ArrowSchema, SchemaRef, TimeUnit};

use crate::codec::schema_from_arrow;
use crate::model::{Row, Schema, Value};
use crate::protocol::{FlightUnit, MessagePrefix, PREFIX_SIZE};

pub const BASE_TS: i64 = 1_700_000_000_000;

pub fn log_schema() -> SchemaRef {
    Arc::new(ArrowSchema::new(vec![
        Field::new("ts", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("level", DataType::Utf8, true),
        Field::new("message", DataType::Utf8, true),
    ]))
}

pub fn log_batch(messages: &[&str]) -> RecordBatch {
    let ts: Vec<i64> = (0..messages.len() as i64).map(|i| BASE_TS + i).collect();
    RecordBatch::try_new(
        log_schema(),
        vec![
            Arc::new(TimestampMillisecondArray::from(ts)) as ArrayRef,
            Arc::new(StringArray::from(vec!["info"; messages.len()])),
            Arc::new(StringArray::from(messages.to_vec())),
        ],
    )
    .unwrap()
}

/// A complete IPC stream: schema, one message per batch, end-of-stream.
pub fn ipc_stream(batches: &[&[&str]]) -> Vec<u8> {
    let schema = log_schema();
    let mut writer = StreamWriter::try_new(Vec::new(), &schema).unwrap();
    for messages in batches {
        writer.write(&log_batch(messages)).unwrap();
    }
    writer.finish().unwrap();
    writer.into_inner().unwrap()
}

pub fn other_schema_stream() -> Vec<u8> {
    let schema = Arc::new(ArrowSchema::new(vec![Field::new("id", DataType::Int64, false)]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef],
    )
    .unwrap();
    let mut writer = StreamWriter::try_new(Vec::new(), &schema).unwrap();
    writer.write(&batch).unwrap();
    writer.finish().unwrap();
    writer.into_inner().unwrap()
}

/// Split a framed stream into its messages (prefix included).
pub fn ipc_messages(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut messages = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let prefix = MessagePrefix::decode(&bytes[offset..]).unwrap().unwrap();
        let metadata_start = offset + PREFIX_SIZE;
        let metadata_end = metadata_start + prefix.metadata_length as usize;
        let body_len = if prefix.is_end_of_stream() {
            0
        } else {
            arrow_ipc::root_as_message(&bytes[metadata_start..metadata_end])
                .unwrap()
                .bodyLength() as usize
        };
        let end = metadata_end + body_len;
        messages.push(bytes[offset..end].to_vec());
        offset = end;
    }
    messages
}

/// Transport units for a log stream, as a Flight server would send them.
pub fn flight_units(batches: &[&[&str]]) -> Vec<FlightUnit> {
    let batches = batches.iter().map(|m| log_batch(m)).collect();
    arrow_flight::utils::batches_to_flight_data(&log_schema(), batches)
        .unwrap()
        .into_iter()
        .map(FlightUnit::from)
        .collect()
}

/// Units for a stream with a dictionary-encoded `level` column.
pub fn dictionary_flight_units(levels: &[&str]) -> Vec<FlightUnit> {
    let schema = Arc::new(ArrowSchema::new(vec![Field::new(
        "level",
        DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
        true,
    )]));
    let levels: DictionaryArray<Int32Type> = levels.iter().copied().collect();
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(levels) as ArrayRef]).unwrap();

    arrow_flight::utils::batches_to_flight_data(&schema, vec![batch])
        .unwrap()
        .into_iter()
        .map(FlightUnit::from)
        .collect()
}

pub fn session_schema() -> Schema {
    schema_from_arrow(&log_schema())
}

/// Rows with sequential timestamps and the given messages.
pub fn rows(schema: &Schema, start: i64, messages: &[&str]) -> Vec<Row> {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| {
            Row::new(
                schema.names().clone(),
                vec![
                    Value::Timestamp(BASE_TS + start + i as i64),
                    Value::Utf8("info".to_string()),
                    Value::Utf8(m.to_string()),
                ],
            )
        })
        .collect()
}

/// `count` rows whose messages are `row-{start}` .. `row-{start + count - 1}`.
pub fn numbered_rows(schema: &Schema, start: usize, count: usize) -> Vec<Row> {
    let messages: Vec<String> = (start..start + count).map(|i| format!("row-{}", i)).collect();
    let refs: Vec<&str> = messages.iter().map(String::as_str).collect();
    rows(schema, start as i64, &refs)
}
