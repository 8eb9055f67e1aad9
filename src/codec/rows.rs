//! Arrow columns to row values.
//!
//! Conversion is column-major: each array is turned into a `Vec<Value>` once,
//! then the columns are zipped into rows. Types we do not understand never
//! fail the batch; their cells become [`Value::Unknown`].

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{
    ArrowPrimitiveType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type, Int32Type,
    Int64Type, Int8Type, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, RecordBatch};
use arrow_schema::{DataType, Schema as ArrowSchema, TimeUnit};

use crate::model::{Column, ColumnType, Row, Schema, Value};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Map a wire type onto the logical column type.
pub fn column_type(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnType::Utf8,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => ColumnType::Int,
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            ColumnType::UInt
        }
        DataType::Float32 | DataType::Float64 => ColumnType::Float,
        DataType::Boolean => ColumnType::Bool,
        DataType::Timestamp(_, _) => ColumnType::Timestamp,
        DataType::Date32 | DataType::Date64 => ColumnType::Date,
        DataType::Dictionary(_, value_type) => column_type(value_type),
        _ => ColumnType::Unsupported,
    }
}

/// Build the session schema from an Arrow schema.
pub fn schema_from_arrow(schema: &ArrowSchema) -> Schema {
    let columns = schema
        .fields()
        .iter()
        .map(|field| Column {
            name: field.name().clone(),
            column_type: column_type(field.data_type()),
            wire_type: field.data_type().to_string(),
        })
        .collect();
    Schema::new(columns)
}

/// Convert a record batch into rows that share the schema's column names.
pub fn rows_from_batch(batch: &RecordBatch, schema: &Schema) -> Vec<Row> {
    let names: &Arc<[Arc<str>]> = schema.names();
    let mut columns: Vec<std::vec::IntoIter<Value>> = batch
        .columns()
        .iter()
        .map(|array| column_values(array.as_ref()).into_iter())
        .collect();

    (0..batch.num_rows())
        .map(|_| {
            let values = columns
                .iter_mut()
                .map(|column| column.next().unwrap_or(Value::Unknown))
                .collect();
            Row::new(names.clone(), values)
        })
        .collect()
}

/// Decode every cell of one array.
pub fn column_values(array: &dyn Array) -> Vec<Value> {
    match array.data_type() {
        DataType::Utf8 => strings(array.as_string::<i32>().iter()),
        DataType::LargeUtf8 => strings(array.as_string::<i64>().iter()),
        DataType::Utf8View => strings(array.as_string_view().iter()),
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        DataType::Int8 => primitive::<Int8Type>(array, |v| Value::Int(v as i64)),
        DataType::Int16 => primitive::<Int16Type>(array, |v| Value::Int(v as i64)),
        DataType::Int32 => primitive::<Int32Type>(array, |v| Value::Int(v as i64)),
        DataType::Int64 => primitive::<Int64Type>(array, Value::Int),
        DataType::UInt8 => primitive::<UInt8Type>(array, |v| Value::UInt(v as u64)),
        DataType::UInt16 => primitive::<UInt16Type>(array, |v| Value::UInt(v as u64)),
        DataType::UInt32 => primitive::<UInt32Type>(array, |v| Value::UInt(v as u64)),
        DataType::UInt64 => primitive::<UInt64Type>(array, Value::UInt),
        DataType::Float32 => primitive::<Float32Type>(array, |v| Value::Float(v as f64)),
        DataType::Float64 => primitive::<Float64Type>(array, Value::Float),
        DataType::Timestamp(TimeUnit::Second, _) => {
            primitive::<TimestampSecondType>(array, |v| millis(v.checked_mul(1_000)))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            primitive::<TimestampMillisecondType>(array, Value::Timestamp)
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            primitive::<TimestampMicrosecondType>(array, |v| Value::Timestamp(v.div_euclid(1_000)))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            primitive::<TimestampNanosecondType>(array, |v| {
                Value::Timestamp(v.div_euclid(1_000_000))
            })
        }
        DataType::Date32 => {
            primitive::<Date32Type>(array, |v| millis((v as i64).checked_mul(MILLIS_PER_DAY)))
        }
        DataType::Date64 => primitive::<Date64Type>(array, Value::Timestamp),
        DataType::Dictionary(_, value_type) => {
            match arrow_cast::cast::cast(array, value_type) {
                Ok(values) => column_values(values.as_ref()),
                Err(e) => {
                    tracing::debug!("Dictionary column not decodable: {}", e);
                    vec![Value::Unknown; array.len()]
                }
            }
        }
        _ => vec![Value::Unknown; array.len()],
    }
}

fn primitive<T: ArrowPrimitiveType>(
    array: &dyn Array,
    convert: impl Fn(T::Native) -> Value,
) -> Vec<Value> {
    array
        .as_primitive::<T>()
        .iter()
        .map(|v| v.map_or(Value::Null, &convert))
        .collect()
}

fn strings<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<Value> {
    values
        .map(|v| v.map_or(Value::Null, |s| Value::Utf8(s.to_string())))
        .collect()
}

/// Overflowed conversions decode to the unknown sentinel.
fn millis(value: Option<i64>) -> Value {
    value.map_or(Value::Unknown, Value::Timestamp)
}
