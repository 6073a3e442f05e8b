use super::{quoted_path, Statement};
use crate::path::PathResolver;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storage layout of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Row-oriented (OLTP) table
    Row,
    /// Column-oriented (OLAP) table
    #[default]
    Column,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Row => "ROW",
            TableKind::Column => "COLUMN",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `CREATE TABLE` for a row or column table.
///
/// ```
/// use sth_core::query::{CreateTable, Statement};
/// use sth_core::schema::{Column, PrimitiveType, Schema};
/// use sth_core::PathResolver;
///
/// let schema = Schema::new()
///     .with_column(Column::new("id", PrimitiveType::Int32).not_null())
///     .with_key_columns(["id"]);
/// let yql = CreateTable::new("t").with_schema(schema).to_yql(&PathResolver::new("local", "", None));
/// assert!(yql.starts_with("CREATE TABLE `/local/t`"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    name: String,
    schema: Schema,
    kind: TableKind,
    partition_by: Vec<String>,
    min_partitions: Option<u64>,
}

impl CreateTable {
    /// Column table with an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(),
            kind: TableKind::Column,
            partition_by: Vec::new(),
            min_partitions: None,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    /// Hash-partition by the given columns.
    pub fn with_partition_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_partitions(mut self, count: u64) -> Self {
        self.min_partitions = Some(count);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Statement for CreateTable {
    fn to_yql(&self, resolver: &PathResolver) -> String {
        let mut yql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            quoted_path(resolver, &self.name),
            self.schema.to_yql()
        );
        if !self.partition_by.is_empty() {
            yql.push_str(&format!("\nPARTITION BY HASH({})", self.partition_by.join(", ")));
        }
        yql.push_str(&with_clause(self.kind, self.min_partitions));
        yql
    }

    fn title(&self) -> String {
        match self.kind {
            TableKind::Row => "Create table".to_string(),
            TableKind::Column => "Create column table".to_string(),
        }
    }

    fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("table".to_string(), self.name.clone());
        params.insert("store".to_string(), self.kind.to_string());
        params.insert("schema".to_string(), self.schema.to_yql());
        if !self.partition_by.is_empty() {
            params.insert("partition_by".to_string(), self.partition_by.join(", "));
        }
        if let Some(count) = self.min_partitions {
            params.insert("min_partitions".to_string(), count.to_string());
        }
        params
    }
}

/// `CREATE TABLESTORE`: a column store shared by the tables placed in it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStore {
    name: String,
    schema: Schema,
    min_partitions: Option<u64>,
}

impl CreateTableStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(),
            min_partitions: None,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_min_partitions(mut self, count: u64) -> Self {
        self.min_partitions = Some(count);
        self
    }
}

impl Statement for CreateTableStore {
    fn to_yql(&self, resolver: &PathResolver) -> String {
        format!(
            "CREATE TABLESTORE {} (\n    {}\n){}",
            quoted_path(resolver, &self.name),
            self.schema.to_yql(),
            with_clause(TableKind::Column, self.min_partitions)
        )
    }

    fn title(&self) -> String {
        "Create tablestore".to_string()
    }

    fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("tablestore".to_string(), self.name.clone());
        params.insert("schema".to_string(), self.schema.to_yql());
        if let Some(count) = self.min_partitions {
            params.insert("min_partitions".to_string(), count.to_string());
        }
        params
    }
}

fn with_clause(kind: TableKind, min_partitions: Option<u64>) -> String {
    let mut settings = vec![format!("STORE = {}", kind)];
    if let Some(count) = min_partitions {
        settings.push(format!("AUTO_PARTITIONING_MIN_PARTITIONS_COUNT = {}", count));
    }
    format!("\nWITH ({})", settings.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::TestContext;
    use crate::schema::{Column, Compression, PrimitiveType};

    fn resolver() -> PathResolver {
        PathResolver::new("local", "", Some(TestContext::new("Suite", "create")))
    }

    fn schema() -> Schema {
        Schema::new()
            .with_column(Column::new("id", PrimitiveType::Int32).not_null())
            .with_column(Column::new("level", PrimitiveType::Uint32))
            .with_key_columns(["id"])
    }

    #[test]
    fn test_create_column_table() {
        let yql = CreateTable::new("t").with_schema(schema()).to_yql(&resolver());
        assert_eq!(
            yql,
            "CREATE TABLE `/local/Suite/create/t` (\n    \
             id Int32 NOT NULL,\n    \
             level Uint32,\n    \
             PRIMARY KEY (id)\n)\n\
             WITH (STORE = COLUMN)"
        );
    }

    #[test]
    fn test_create_row_table_with_partitioning() {
        let yql = CreateTable::new("t")
            .with_schema(schema())
            .with_kind(TableKind::Row)
            .with_partition_by(["id"])
            .with_min_partitions(4)
            .to_yql(&resolver());

        assert!(yql.contains("\nPARTITION BY HASH(id)\n"));
        assert!(yql.ends_with("WITH (STORE = ROW, AUTO_PARTITIONING_MIN_PARTITIONS_COUNT = 4)"));
    }

    #[test]
    fn test_create_table_with_family() {
        let schema = Schema::new()
            .with_column(Column::new("id", PrimitiveType::Int64).not_null())
            .with_column(Column::new("payload", PrimitiveType::Utf8).in_family("cold"))
            .with_key_columns(["id"])
            .with_column_family("cold", Compression::Zstd, Some(5));

        let yql = CreateTable::new("t").with_schema(schema).to_yql(&resolver());
        assert!(yql.contains("payload Utf8 FAMILY cold"));
        assert!(yql.contains(r#"FAMILY cold (COMPRESSION = "ZSTD", COMPRESSION_LEVEL = 5)"#));
    }

    #[test]
    fn test_create_tablestore() {
        let stmt = CreateTableStore::new("store")
            .with_schema(schema())
            .with_min_partitions(2);
        let yql = stmt.to_yql(&resolver());

        assert!(yql.starts_with("CREATE TABLESTORE `/local/Suite/create/store` ("));
        assert!(yql.ends_with("WITH (STORE = COLUMN, AUTO_PARTITIONING_MIN_PARTITIONS_COUNT = 2)"));
        assert_eq!(stmt.title(), "Create tablestore");
    }

    #[test]
    fn test_create_table_params() {
        let params = CreateTable::new("t")
            .with_schema(schema())
            .with_kind(TableKind::Row)
            .params();
        assert_eq!(params.get("table").map(String::as_str), Some("t"));
        assert_eq!(params.get("store").map(String::as_str), Some("ROW"));
        assert!(!params.contains_key("min_partitions"));
    }
}
