//! Table schema description: columns, primary key and column families.

use super::types::{BulkColumnType, BulkUpsertColumns, PrimitiveType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Name reported for a column that does not declare a family.
pub const DEFAULT_COLUMN_FAMILY: &str = "default";

/// Column family compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compression {
    Off,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Off => "OFF",
            Compression::Lz4 => "LZ4",
            Compression::Zstd => "ZSTD",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column family with its compression settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ColumnFamily {
    /// Family name
    pub name: String,
    /// Compression codec
    pub compression: Compression,
    /// Codec level, only meaningful for codecs with level tuning
    #[serde(default)]
    pub compression_level: Option<i32>,
}

impl ColumnFamily {
    pub fn new(
        name: impl Into<String>,
        compression: Compression,
        compression_level: Option<i32>,
    ) -> Self {
        Self {
            name: name.into(),
            compression,
            compression_level,
        }
    }

    /// `FAMILY name (COMPRESSION = "LZ4", COMPRESSION_LEVEL = 3)`
    pub fn to_yql(&self) -> String {
        let level = self
            .compression_level
            .map(|l| format!(", COMPRESSION_LEVEL = {}", l))
            .unwrap_or_default();
        format!(
            "FAMILY {} (COMPRESSION = \"{}\"{})",
            self.name, self.compression, level
        )
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column type
    #[serde(rename = "type")]
    pub column_type: PrimitiveType,
    /// Owning column family, if declared
    #[serde(default, rename = "family")]
    pub column_family_name: Option<String>,
    /// Whether NULL is rejected
    #[serde(default)]
    pub not_null: bool,
}

impl Column {
    /// A nullable column in the default family.
    pub fn new(name: impl Into<String>, column_type: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            column_type,
            column_family_name: None,
            not_null: false,
        }
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Place the column in a named family.
    pub fn in_family(mut self, family: impl Into<String>) -> Self {
        self.column_family_name = Some(family.into());
        self
    }

    /// Family name, `"default"` when none was declared.
    pub fn column_family(&self) -> &str {
        match self.column_family_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_COLUMN_FAMILY,
        }
    }

    /// Type declared to the bulk-load API.
    pub fn bulk_upsert_type(&self) -> BulkColumnType {
        if self.not_null {
            BulkColumnType::Primitive(self.column_type)
        } else {
            BulkColumnType::Optional(self.column_type)
        }
    }

    /// `name Type[ FAMILY fam][ NOT NULL]`
    pub fn to_yql(&self) -> String {
        let mut yql = format!("{} {}", self.name, self.column_type);
        if let Some(family) = self.column_family_name.as_deref().filter(|f| !f.is_empty()) {
            yql.push_str(" FAMILY ");
            yql.push_str(family);
        }
        if self.not_null {
            yql.push_str(" NOT NULL");
        }
        yql
    }
}

/// Table schema.
///
/// ```
/// use sth_core::schema::{Column, Compression, PrimitiveType, Schema};
///
/// let schema = Schema::new()
///     .with_column(Column::new("id", PrimitiveType::Int32).not_null())
///     .with_column(Column::new("level", PrimitiveType::Uint32).in_family("family1"))
///     .with_key_columns(["id"])
///     .with_column_family("family1", Compression::Lz4, None);
/// assert_eq!(schema.primary_key_yql(), "PRIMARY KEY (id)");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Schema {
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub column_families: Vec<ColumnFamily>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Append columns to the primary key.
    pub fn with_key_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns.extend(names.into_iter().map(Into::into));
        self
    }

    /// Append a column family.
    pub fn with_column_family(
        mut self,
        name: impl Into<String>,
        compression: Compression,
        compression_level: Option<i32>,
    ) -> Self {
        self.column_families
            .push(ColumnFamily::new(name, compression, compression_level));
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column types for the bulk-load API, in column order.
    pub fn build_bulk_columns_types(&self) -> BulkUpsertColumns {
        let mut result = BulkUpsertColumns::new();
        for c in &self.columns {
            result.add_column(c.name.clone(), c.bulk_upsert_type());
        }
        result
    }

    /// `PRIMARY KEY (a, b)`
    pub fn primary_key_yql(&self) -> String {
        format!("PRIMARY KEY ({})", self.key_columns.join(", "))
    }

    /// Body of a `CREATE TABLE (...)` clause: columns, key, families.
    pub fn to_yql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(Column::to_yql).collect();
        parts.push(self.primary_key_yql());
        parts.extend(self.column_families.iter().map(ColumnFamily::to_yql));
        parts.join(",\n    ")
    }

    /// Check that key columns and column families refer to declared names.
    ///
    /// Never called implicitly: tests deliberately create broken schemas
    /// to observe how the cluster rejects them.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column {}",
                    column.name
                )));
            }
        }

        for key in &self.key_columns {
            if !seen.contains(key.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "key column {} is not a column",
                    key
                )));
            }
        }

        for column in &self.columns {
            let family = column.column_family();
            if family != DEFAULT_COLUMN_FAMILY
                && !self.column_families.iter().any(|f| f.name == family)
            {
                return Err(Error::InvalidSchema(format!(
                    "column {} refers to undeclared family {}",
                    column.name, family
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::new()
            .with_column(Column::new("id", PrimitiveType::Int32).not_null())
            .with_column(Column::new("level", PrimitiveType::Uint32))
            .with_key_columns(["id"])
    }

    #[test]
    fn test_primary_key_and_bulk_types() {
        let schema = sample_schema();
        assert_eq!(schema.primary_key_yql(), "PRIMARY KEY (id)");

        let types = schema.build_bulk_columns_types();
        assert_eq!(types.len(), 2);
        assert_eq!(
            types.get("id"),
            Some(BulkColumnType::Primitive(PrimitiveType::Int32))
        );
        assert_eq!(
            types.get("level"),
            Some(BulkColumnType::Optional(PrimitiveType::Uint32))
        );
    }

    #[test]
    fn test_column_yql() {
        let column = Column::new("level", PrimitiveType::Uint32)
            .in_family("family1")
            .not_null();
        assert_eq!(column.to_yql(), "level Uint32 FAMILY family1 NOT NULL");
        assert_eq!(column.column_family(), "family1");

        let plain = Column::new("id", PrimitiveType::Int64);
        assert_eq!(plain.to_yql(), "id Int64");
        assert_eq!(plain.column_family(), "default");
    }

    #[test]
    fn test_column_family_yql() {
        let lz4 = ColumnFamily::new("family1", Compression::Lz4, None);
        assert_eq!(lz4.to_yql(), r#"FAMILY family1 (COMPRESSION = "LZ4")"#);

        let zstd = ColumnFamily::new("family2", Compression::Zstd, Some(5));
        assert_eq!(
            zstd.to_yql(),
            r#"FAMILY family2 (COMPRESSION = "ZSTD", COMPRESSION_LEVEL = 5)"#
        );
    }

    #[test]
    fn test_schema_body() {
        let schema = sample_schema().with_column_family("default", Compression::Off, None);
        assert_eq!(
            schema.to_yql(),
            "id Int32 NOT NULL,\n    level Uint32,\n    PRIMARY KEY (id),\n    FAMILY default (COMPRESSION = \"OFF\")"
        );
    }

    #[test]
    fn test_validate() {
        assert!(sample_schema().validate().is_ok());

        let bad_key = sample_schema().with_key_columns(["missing"]);
        assert!(matches!(bad_key.validate(), Err(Error::InvalidSchema(_))));

        let bad_family = Schema::new()
            .with_column(Column::new("id", PrimitiveType::Int32).in_family("nope"))
            .with_key_columns(["id"]);
        assert!(bad_family.validate().is_err());
    }

    #[test]
    fn test_schema_from_toml() {
        let schema: Schema = toml::from_str(
            r#"
            key_columns = ["id"]

            [[columns]]
            name = "id"
            type = "Int32"
            not_null = true

            [[columns]]
            name = "level"
            type = "Uint32"
            family = "family1"

            [[column_families]]
            name = "family1"
            compression = "ZSTD"
            compression_level = 3
            "#,
        )
        .unwrap();

        assert_eq!(schema.columns.len(), 2);
        assert!(schema.columns[0].not_null);
        assert_eq!(schema.columns[1].column_family(), "family1");
        assert_eq!(schema.column_families[0].compression, Compression::Zstd);
        assert!(schema.validate().is_ok());
    }
}
