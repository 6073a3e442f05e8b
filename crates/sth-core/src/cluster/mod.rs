//! The cluster under test, as seen through its driver.
//!
//! [`Cluster`] is the only seam between the helper and the database client.
//! A real driver binding implements it; [`memory::MemoryCluster`] is a
//! deterministic in-process implementation for tests and dry runs.

pub mod memory;

use crate::error::ClusterResult;
use crate::schema::{BulkUpsertColumns, Row, Schema, Value};
use std::time::Duration;

/// Operations the helper needs from the database driver.
///
/// Every call blocks until the cluster answers. Failures carry the remote
/// status code so the execution engine can classify them.
pub trait Cluster: Send + Sync {
    /// Execute a data-definition statement in a fresh session.
    fn execute_scheme(&self, yql: &str) -> ClusterResult<()>;

    /// Start a scan query; pages are fetched as the stream is consumed.
    fn scan_query(&self, yql: &str, timeout: Option<Duration>) -> ClusterResult<ScanStream<'_>>;

    /// Acquire a query session pool for the duration of one call.
    ///
    /// The pool is released when the returned value is dropped.
    fn query_session_pool(&self) -> ClusterResult<Box<dyn QuerySessionPool + '_>>;

    /// Load rows into the table at the absolute `path`.
    ///
    /// With `retry` set, the driver retries transient transport errors on
    /// its own before reporting a failure.
    fn bulk_upsert(
        &self,
        path: &str,
        rows: &[Row],
        columns: &BulkUpsertColumns,
        retry: Option<&RetrySettings>,
    ) -> ClusterResult<()>;

    /// Remove an empty directory.
    fn remove_directory(&self, path: &str) -> ClusterResult<()>;

    /// Describe a single path.
    ///
    /// A missing path is reported either as `Ok(None)` or as a scheme
    /// error, depending on the driver.
    fn describe_path(&self, path: &str) -> ClusterResult<Option<SchemeEntry>>;

    /// Direct children of a directory or container.
    fn list_directory(&self, path: &str) -> ClusterResult<Vec<SchemeEntry>>;

    /// Describe a table's columns and primary key.
    fn describe_table(&self, path: &str) -> ClusterResult<TableDescription>;

    /// Probe liveness; `None` means alive, otherwise a diagnostic.
    fn check_alive(&self, timeout: Duration) -> Option<String>;
}

/// Paginated scan query results.
pub type ScanStream<'a> = Box<dyn Iterator<Item = ClusterResult<ResultSet>> + 'a>;

/// A pooled query executor scoped to one call.
pub trait QuerySessionPool {
    /// Execute `yql`, letting the pool retry per `settings`.
    fn execute_with_retries(
        &self,
        yql: &str,
        settings: &RetrySettings,
    ) -> ClusterResult<Vec<ResultSet>>;
}

/// Driver-level retry settings.
///
/// Distinct from the engine's fixed-delay policy: this is the budget the
/// driver spends on transport errors before one ever reaches the engine.
/// Backoff between those retries is the driver's own business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// Maximum number of retries (default: 10)
    pub max_retries: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_retries: 10 }
    }
}

impl RetrySettings {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

/// Kind of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeEntryType {
    Directory,
    Database,
    Table,
    ColumnTable,
    ColumnStore,
    ExternalDataSource,
    ExternalTable,
    Topic,
    Sequence,
    Replication,
    View,
    Unknown,
}

/// One node of the cluster's hierarchical namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeEntry {
    /// Entry name; relative to the listing root once returned by the reconciler
    pub name: String,
    /// Entry kind
    pub entry_type: SchemeEntryType,
}

impl SchemeEntry {
    pub fn new(name: impl Into<String>, entry_type: SchemeEntryType) -> Self {
        Self {
            name: name.into(),
            entry_type,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(
            self.entry_type,
            SchemeEntryType::Directory | SchemeEntryType::Database
        )
    }

    /// Row or column table.
    pub fn is_any_table(&self) -> bool {
        matches!(
            self.entry_type,
            SchemeEntryType::Table | SchemeEntryType::ColumnTable
        )
    }

    pub fn is_column_store(&self) -> bool {
        self.entry_type == SchemeEntryType::ColumnStore
    }

    pub fn is_external_data_source(&self) -> bool {
        self.entry_type == SchemeEntryType::ExternalDataSource
    }

    /// Entries whose children are listed recursively.
    pub fn is_container(&self) -> bool {
        self.is_directory() || self.is_column_store()
    }
}

/// Table description returned by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescription {
    /// Absolute table path
    pub path: String,
    /// Row table or column table
    pub entry_type: SchemeEntryType,
    /// Columns, primary key and families as stored by the cluster
    pub schema: Schema,
}

/// A page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Row values, one entry per column
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn with_row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// First cell of the first row.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.first())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json_rows(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| (c.clone(), serde_json::to_value(v).unwrap_or_default()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_settings_budget() {
        assert_eq!(RetrySettings::default().max_retries, 10);
        assert_eq!(RetrySettings::with_max_retries(2).max_retries, 2);
    }

    #[test]
    fn test_scheme_entry_kinds() {
        assert!(SchemeEntry::new("d", SchemeEntryType::Directory).is_container());
        assert!(SchemeEntry::new("s", SchemeEntryType::ColumnStore).is_container());
        assert!(!SchemeEntry::new("t", SchemeEntryType::ColumnTable).is_container());
        assert!(SchemeEntry::new("t", SchemeEntryType::Table).is_any_table());
        assert!(SchemeEntry::new("e", SchemeEntryType::ExternalDataSource).is_external_data_source());
    }

    #[test]
    fn test_result_set_lookup() {
        let rs = ResultSet::new(["RawBytes", "BlobRangeSize"])
            .with_row([10u64, 4])
            .with_row([5u64, 1]);

        assert_eq!(rs.len(), 2);
        assert_eq!(rs.value(1, "RawBytes"), Some(&Value::Uint(5)));
        assert_eq!(rs.value(0, "Missing"), None);
        assert_eq!(rs.scalar(), Some(&Value::Uint(10)));
    }

    #[test]
    fn test_result_set_json() {
        let rs = ResultSet::new(["id", "name"]).with_row([Value::Int(1), Value::from("a")]);
        assert_eq!(rs.to_json_rows().to_string(), r#"[{"id":1,"name":"a"}]"#);
    }
}
