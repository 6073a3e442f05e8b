//! Column types and cell values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A row keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// YQL primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PrimitiveType {
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    Date,
    Datetime,
    Timestamp,
    Interval,
    String,
    Utf8,
    Json,
    JsonDocument,
    Uuid,
}

impl PrimitiveType {
    /// Type name as written in YQL.
    pub fn as_yql(&self) -> &'static str {
        match self {
            PrimitiveType::Bool => "Bool",
            PrimitiveType::Int8 => "Int8",
            PrimitiveType::Uint8 => "Uint8",
            PrimitiveType::Int16 => "Int16",
            PrimitiveType::Uint16 => "Uint16",
            PrimitiveType::Int32 => "Int32",
            PrimitiveType::Uint32 => "Uint32",
            PrimitiveType::Int64 => "Int64",
            PrimitiveType::Uint64 => "Uint64",
            PrimitiveType::Float => "Float",
            PrimitiveType::Double => "Double",
            PrimitiveType::Date => "Date",
            PrimitiveType::Datetime => "Datetime",
            PrimitiveType::Timestamp => "Timestamp",
            PrimitiveType::Interval => "Interval",
            PrimitiveType::String => "String",
            PrimitiveType::Utf8 => "Utf8",
            PrimitiveType::Json => "Json",
            PrimitiveType::JsonDocument => "JsonDocument",
            PrimitiveType::Uuid => "Uuid",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_yql())
    }
}

impl FromStr for PrimitiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.to_lowercase().as_str() {
            "bool" => PrimitiveType::Bool,
            "int8" => PrimitiveType::Int8,
            "uint8" => PrimitiveType::Uint8,
            "int16" => PrimitiveType::Int16,
            "uint16" => PrimitiveType::Uint16,
            "int32" => PrimitiveType::Int32,
            "uint32" => PrimitiveType::Uint32,
            "int64" => PrimitiveType::Int64,
            "uint64" => PrimitiveType::Uint64,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            "date" => PrimitiveType::Date,
            "datetime" => PrimitiveType::Datetime,
            "timestamp" => PrimitiveType::Timestamp,
            "interval" => PrimitiveType::Interval,
            "string" | "bytes" => PrimitiveType::String,
            "utf8" | "text" => PrimitiveType::Utf8,
            "json" => PrimitiveType::Json,
            "jsondocument" => PrimitiveType::JsonDocument,
            "uuid" => PrimitiveType::Uuid,
            other => return Err(format!("unknown primitive type: {}", other)),
        };
        Ok(parsed)
    }
}

/// Column type as declared to the bulk-load API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkColumnType {
    /// NOT NULL column
    Primitive(PrimitiveType),
    /// Nullable column
    Optional(PrimitiveType),
}

impl BulkColumnType {
    pub fn primitive(&self) -> PrimitiveType {
        match self {
            BulkColumnType::Primitive(t) | BulkColumnType::Optional(t) => *t,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, BulkColumnType::Optional(_))
    }
}

impl fmt::Display for BulkColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkColumnType::Primitive(t) => write!(f, "{}", t),
            BulkColumnType::Optional(t) => write!(f, "Optional<{}>", t),
        }
    }
}

/// Ordered column-type descriptor for a bulk-load call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkUpsertColumns {
    columns: Vec<(String, BulkColumnType)>,
}

impl BulkUpsertColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn add_column(&mut self, name: impl Into<String>, column_type: BulkColumnType) {
        self.columns.push((name.into(), column_type));
    }

    /// Builder form of [`add_column`](Self::add_column).
    pub fn with_column(mut self, name: impl Into<String>, column_type: BulkColumnType) -> Self {
        self.add_column(name, column_type);
        self
    }

    pub fn get(&self, name: &str) -> Option<BulkColumnType> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, BulkColumnType)> {
        self.columns.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint(v as u64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Build a [`Row`] from `name => value` pairs.
///
/// ```
/// use sth_core::row;
/// let r = row! { "id" => 1, "level" => None::<u32> };
/// assert_eq!(r.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    ($($name:expr => $value:expr),* $(,)?) => {{
        let mut row = $crate::schema::Row::new();
        $(row.insert($name.to_string(), $crate::schema::Value::from($value));)*
        row
    }};
}
