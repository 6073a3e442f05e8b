//! Schema model: table columns, keys and families, plus the column types
//! and values exchanged with the bulk-load API.

mod table;
mod types;

pub use table::{Column, ColumnFamily, Compression, Schema, DEFAULT_COLUMN_FAMILY};
pub use types::{BulkColumnType, BulkUpsertColumns, PrimitiveType, Row, Value};
