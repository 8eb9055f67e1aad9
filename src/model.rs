//! Decoded data model: schema, columns, rows and scalar values.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Logical column type as shown to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// UTF-8 text.
    Utf8,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    UInt,
    /// Floating point.
    Float,
    /// Boolean.
    Bool,
    /// Point in time, normalized to epoch milliseconds.
    Timestamp,
    /// Calendar date, normalized to epoch milliseconds.
    Date,
    /// Anything else. Values decode to [`Value::Unknown`].
    Unsupported,
}

/// One column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Logical type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Type name as carried on the wire (e.g. `Timestamp(Millisecond, None)`).
    pub wire_type: String,
}

/// Ordered column descriptors. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    names: Arc<[Arc<str>]>,
}

impl Schema {
    /// Create a schema from column descriptors.
    pub fn new(columns: Vec<Column>) -> Self {
        let names = columns
            .iter()
            .map(|c| Arc::<str>::from(c.name.as_str()))
            .collect();
        Self { columns, names }
    }

    /// Column descriptors in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Shared column names, used by every row of this schema.
    pub fn names(&self) -> &Arc<[Arc<str>]> {
        &self.names
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.columns.serialize(serializer)
    }
}

/// A scalar cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Utf8(String),
    /// Epoch milliseconds, UTC.
    Timestamp(i64),
    /// Value of a column whose type is not supported.
    Unknown,
}

impl Value {
    /// Render a timestamp as RFC 3339 with millisecond precision.
    fn timestamp_string(millis: i64) -> Option<String> {
        DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// String view for the text payload, if this is a UTF-8 value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }
}

/// Stringified form used by search. Nulls and unknowns render empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Unknown => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Utf8(v) => f.write_str(v),
            Value::Timestamp(ms) => match Value::timestamp_string(*ms) {
                Some(s) => f.write_str(&s),
                None => write!(f, "{}", ms),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Unknown => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Utf8(v) => serializer.serialize_str(v),
            Value::Timestamp(ms) => match Value::timestamp_string(*ms) {
                Some(s) => serializer.serialize_str(&s),
                None => serializer.serialize_i64(*ms),
            },
        }
    }
}

/// One decoded row: exactly one value per schema column, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    names: Arc<[Arc<str>]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. `values` must line up with `names`.
    pub fn new(names: Arc<[Arc<str>]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    /// Value of the named column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| &**n == name)
            .map(|i| &self.values[i])
    }

    /// Values in schema order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `(column, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(|n| &**n).zip(self.values.iter())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            Column {
                name: "ts".to_string(),
                column_type: ColumnType::Timestamp,
                wire_type: "Timestamp(Millisecond, None)".to_string(),
            },
            Column {
                name: "message".to_string(),
                column_type: ColumnType::Utf8,
                wire_type: "Utf8".to_string(),
            },
        ])
    }

    #[test]
    fn test_row_lookup_by_name() {
        let schema = schema();
        let row = Row::new(
            schema.names().clone(),
            vec![Value::Timestamp(0), Value::Utf8("hello".to_string())],
        );

        assert_eq!(row.get("message").and_then(Value::as_str), Some("hello"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_display_for_search() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Unknown.to_string(), "");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(
            Value::Timestamp(1_700_000_000_123).to_string(),
            "2023-11-14T22:13:20.123Z"
        );
    }

    #[test]
    fn test_row_serializes_as_ordered_map() {
        let schema = schema();
        let row = Row::new(
            schema.names().clone(),
            vec![Value::Timestamp(0), Value::Null],
        );

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"ts":"1970-01-01T00:00:00.000Z","message":null}"#);
    }

    #[test]
    fn test_schema_serializes_columns() {
        let json = serde_json::to_value(schema()).unwrap();
        assert_eq!(json[0]["name"], "ts");
        assert_eq!(json[0]["type"], "timestamp");
        assert_eq!(json[1]["type"], "utf8");
    }
}
