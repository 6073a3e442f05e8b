//! In-process cluster for tests and dry runs.
//!
//! [`MemoryCluster`] keeps a catalog tree under one database root, executes
//! the create and drop statements this crate renders, stores bulk-loaded
//! rows keyed by primary key and answers `SELECT count(*)` scans from them.
//! Anything else is scripted: queued scan and query results, queued
//! failures per [`Operation`], and the liveness diagnostic. Every call is
//! appended to a log that tests can inspect.

use super::{
    Cluster, QuerySessionPool, ResultSet, RetrySettings, ScanStream, SchemeEntry,
    SchemeEntryType, TableDescription,
};
use crate::error::{ClusterError, ClusterResult};
use crate::path;
use crate::schema::{BulkUpsertColumns, Column, ColumnFamily, Compression, PrimitiveType, Row, Schema, Value};
use crate::status::StatusCode;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tracing::debug;

/// Cluster call kinds, used to script failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SchemeQuery,
    ScanQuery,
    QuerySessionPool,
    Query,
    BulkUpsert,
    RemoveDirectory,
    DescribePath,
    ListDirectory,
    DescribeTable,
}

/// One recorded cluster call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Scheme(String),
    Scan {
        yql: String,
        timeout: Option<Duration>,
    },
    PoolAcquired,
    Query {
        yql: String,
        attempt: u32,
    },
    PoolReleased,
    BulkUpsert {
        path: String,
        rows: usize,
        driver_retry: bool,
        attempt: u32,
    },
    RemoveDirectory(String),
    DescribePath(String),
    ListDirectory(String),
    DescribeTable(String),
}

#[derive(Debug, Clone)]
struct Node {
    entry_type: SchemeEntryType,
    schema: Option<Schema>,
    rows: BTreeMap<String, Row>,
}

impl Node {
    fn new(entry_type: SchemeEntryType) -> Self {
        Self {
            entry_type,
            schema: None,
            rows: BTreeMap::new(),
        }
    }

    fn with_schema(entry_type: SchemeEntryType, schema: Schema) -> Self {
        Self {
            schema: Some(schema),
            ..Self::new(entry_type)
        }
    }

    fn is_container(&self) -> bool {
        SchemeEntry::new("", self.entry_type).is_container()
    }
}

#[derive(Debug, Default)]
struct State {
    catalog: BTreeMap<String, Node>,
    failures: HashMap<Operation, VecDeque<ClusterError>>,
    scan_results: VecDeque<Vec<ResultSet>>,
    query_results: VecDeque<Vec<ResultSet>>,
    liveness: Option<String>,
    calls: Vec<Call>,
}

impl State {
    fn take_failure(&mut self, op: Operation) -> ClusterResult<()> {
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                debug!(operation = ?op, status = %err.status, "Injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn has_children(&self, path: &str) -> bool {
        let prefix = format!("{}/", path);
        self.catalog
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(p, _)| p.starts_with(&prefix))
    }

    fn children(&self, path: &str) -> Vec<SchemeEntry> {
        let prefix = format!("{}/", path);
        self.catalog
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .filter_map(|(p, node)| {
                let name = &p[prefix.len()..];
                (!name.contains('/')).then(|| SchemeEntry::new(name, node.entry_type))
            })
            .collect()
    }
}

/// Deterministic in-memory [`Cluster`].
#[derive(Debug)]
pub struct MemoryCluster {
    root: String,
    state: Mutex<State>,
}

impl MemoryCluster {
    /// Cluster holding one database, with its `.sys` directory.
    pub fn new(database: &str) -> Self {
        let root = format!("/{}", database.trim_matches('/'));
        let mut state = State::default();
        state
            .catalog
            .insert(root.clone(), Node::new(SchemeEntryType::Database));
        state
            .catalog
            .insert(path::join(&root, ".sys"), Node::new(SchemeEntryType::Directory));
        Self {
            root,
            state: Mutex::new(state),
        }
    }

    /// Absolute path of the database root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Create a directory and any missing parents.
    pub fn mkdir(&self, path: &str) -> ClusterResult<()> {
        let mut state = self.state.lock();
        self.ensure_parents(&mut state, &path::join(path, "_"))
    }

    /// Place an entry of any kind, creating missing parent directories.
    pub fn insert_entry(&self, path: &str, entry_type: SchemeEntryType) -> ClusterResult<()> {
        let mut state = self.state.lock();
        self.create_node(&mut state, path, Node::new(entry_type))
    }

    /// Fail the next call of kind `op` with `error`.
    pub fn fail_next(&self, op: Operation, error: ClusterError) {
        self.fail_times(op, error, 1);
    }

    /// Fail the next `times` calls of kind `op` with `error`.
    pub fn fail_times(&self, op: Operation, error: ClusterError, times: usize) {
        let mut state = self.state.lock();
        let queue = state.failures.entry(op).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// Queue the pages returned by the next scripted scan query.
    pub fn push_scan_result(&self, pages: Vec<ResultSet>) {
        self.state.lock().scan_results.push_back(pages);
    }

    /// Queue the result sets returned by the next successful query.
    pub fn push_query_result(&self, result_sets: Vec<ResultSet>) {
        self.state.lock().query_results.push_back(result_sets);
    }

    /// Diagnostic returned by the liveness probe; `None` means alive.
    pub fn set_liveness(&self, diagnostic: Option<String>) {
        self.state.lock().liveness = diagnostic;
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Scheme statements received so far, including failed ones.
    pub fn scheme_statements(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Scheme(yql) => Some(yql.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().catalog.contains_key(path)
    }

    pub fn entry_type(&self, path: &str) -> Option<SchemeEntryType> {
        self.state.lock().catalog.get(path).map(|n| n.entry_type)
    }

    /// All catalog paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.state.lock().catalog.keys().cloned().collect()
    }

    /// Stored rows of a table, in primary key order.
    pub fn rows(&self, path: &str) -> Vec<Row> {
        self.state
            .lock()
            .catalog
            .get(path)
            .map(|n| n.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn record(&self, state: &mut State, call: Call) {
        state.calls.push(call);
    }

    fn ensure_parents(&self, state: &mut State, path: &str) -> ClusterResult<()> {
        let relative = path
            .strip_prefix(&self.root)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                ClusterError::scheme(format!("Path {} is outside database {}", path, self.root))
            })?;

        let mut current = self.root.clone();
        let segments: Vec<&str> = relative.split('/').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            current = path::join(&current, segment);
            match state.catalog.get(&current) {
                Some(node) if node.is_container() => {}
                Some(node) => {
                    return Err(ClusterError::scheme(format!(
                        "Parent {} is a {:?}, not a directory",
                        current, node.entry_type
                    )))
                }
                None => {
                    state
                        .catalog
                        .insert(current.clone(), Node::new(SchemeEntryType::Directory));
                }
            }
        }
        Ok(())
    }

    fn create_node(&self, state: &mut State, path: &str, node: Node) -> ClusterResult<()> {
        if state.catalog.contains_key(path) {
            return Err(ClusterError::new(
                StatusCode::AlreadyExists,
                format!("Path {} already exists", path),
            ));
        }
        self.ensure_parents(state, path)?;
        debug!(path, entry_type = ?node.entry_type, "Created catalog entry");
        state.catalog.insert(path.to_string(), node);
        Ok(())
    }

    fn drop_node(
        &self,
        state: &mut State,
        path: &str,
        accepts: fn(SchemeEntryType) -> bool,
        what: &str,
    ) -> ClusterResult<()> {
        let node = state
            .catalog
            .get(path)
            .ok_or_else(|| ClusterError::scheme(format!("Path does not exist: {}", path)))?;
        if !accepts(node.entry_type) {
            return Err(ClusterError::scheme(format!(
                "Path {} is a {:?}, not a {}",
                path, node.entry_type, what
            )));
        }
        if state.has_children(path) {
            return Err(ClusterError::scheme(format!("{} {} is not empty", what, path)));
        }
        state.catalog.remove(path);
        debug!(path, "Dropped catalog entry");
        Ok(())
    }

    fn apply(&self, state: &mut State, ddl: Ddl) -> ClusterResult<()> {
        match ddl {
            Ddl::CreateTable { path, schema, kind } => {
                check_table_schema(&schema, kind)?;
                self.create_node(state, &path, Node::with_schema(kind, schema))
            }
            Ddl::CreateTableStore { path, schema } => {
                check_table_schema(&schema, SchemeEntryType::ColumnStore)?;
                self.create_node(
                    state,
                    &path,
                    Node::with_schema(SchemeEntryType::ColumnStore, schema),
                )
            }
            Ddl::CreateExternalDataSource { path } => {
                self.create_node(state, &path, Node::new(SchemeEntryType::ExternalDataSource))
            }
            Ddl::DropTable { path } => self.drop_node(
                state,
                &path,
                |t| matches!(t, SchemeEntryType::Table | SchemeEntryType::ColumnTable),
                "table",
            ),
            Ddl::DropTableStore { path } => self.drop_node(
                state,
                &path,
                |t| t == SchemeEntryType::ColumnStore,
                "tablestore",
            ),
            Ddl::DropExternalDataSource { path } => self.drop_node(
                state,
                &path,
                |t| t == SchemeEntryType::ExternalDataSource,
                "external data source",
            ),
        }
    }

    /// Run `attempt` until it succeeds, fails terminally or `settings`
    /// allows no more retries.
    fn with_driver_retry<T>(
        &self,
        settings: Option<&RetrySettings>,
        mut attempt: impl FnMut(u32) -> ClusterResult<T>,
    ) -> ClusterResult<T> {
        let max_retries = settings.map_or(0, |s| s.max_retries);
        let mut n = 0;
        loop {
            match attempt(n) {
                Err(err) if err.status.is_transport_retriable() && n < max_retries => {
                    debug!(attempt = n, status = %err.status, "Driver retry");
                    n += 1;
                }
                result => return result,
            }
        }
    }

    fn upsert_rows(
        &self,
        state: &mut State,
        path: &str,
        rows: &[Row],
        columns: &BulkUpsertColumns,
    ) -> ClusterResult<()> {
        let node = state
            .catalog
            .get_mut(path)
            .ok_or_else(|| ClusterError::scheme(format!("Path not found: {}", path)))?;
        if !matches!(
            node.entry_type,
            SchemeEntryType::Table | SchemeEntryType::ColumnTable
        ) {
            return Err(ClusterError::scheme(format!("{} is not a table", path)));
        }

        let key_columns = match &node.schema {
            Some(schema) => {
                check_bulk_columns(schema, columns)?;
                schema.key_columns.clone()
            }
            None => Vec::new(),
        };

        for row in rows {
            if let Some(name) = row.keys().find(|name| columns.get(name).is_none()) {
                return Err(ClusterError::new(
                    StatusCode::BadRequest,
                    format!("Row column {} is not declared for bulk upsert", name),
                ));
            }
            for (name, column_type) in columns.iter() {
                let is_null = row.get(name).map_or(true, Value::is_null);
                if is_null && !column_type.is_optional() {
                    return Err(ClusterError::new(
                        StatusCode::BadRequest,
                        format!("NULL value for NOT NULL column {}", name),
                    ));
                }
            }
        }

        for row in rows {
            let key = if key_columns.is_empty() {
                format!("{:020}", node.rows.len())
            } else {
                key_columns
                    .iter()
                    .map(|k| row.get(k).map(Value::to_string).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\u{1f}")
            };
            node.rows.insert(key, row.clone());
        }
        Ok(())
    }
}

impl Cluster for MemoryCluster {
    fn execute_scheme(&self, yql: &str) -> ClusterResult<()> {
        let mut state = self.state.lock();
        self.record(&mut state, Call::Scheme(yql.to_string()));
        state.take_failure(Operation::SchemeQuery)?;
        let ddl = parse_ddl(yql)?;
        self.apply(&mut state, ddl)
    }

    fn scan_query(&self, yql: &str, timeout: Option<Duration>) -> ClusterResult<ScanStream<'_>> {
        let mut state = self.state.lock();
        self.record(
            &mut state,
            Call::Scan {
                yql: yql.to_string(),
                timeout,
            },
        );
        state.take_failure(Operation::ScanQuery)?;

        if let Some(table) = parse_count_query(yql) {
            let node = state
                .catalog
                .get(table)
                .ok_or_else(|| ClusterError::scheme(format!("Table not found: {}", table)))?;
            let page = ResultSet::new(["column0"]).with_row([node.rows.len() as u64]);
            return Ok(Box::new(std::iter::once(Ok::<_, ClusterError>(page))));
        }

        let pages = state.scan_results.pop_front().unwrap_or_default();
        Ok(Box::new(pages.into_iter().map(Ok::<_, ClusterError>)))
    }

    fn query_session_pool(&self) -> ClusterResult<Box<dyn QuerySessionPool + '_>> {
        let mut state = self.state.lock();
        state.take_failure(Operation::QuerySessionPool)?;
        self.record(&mut state, Call::PoolAcquired);
        Ok(Box::new(MemoryQueryPool { cluster: self }))
    }

    fn bulk_upsert(
        &self,
        path: &str,
        rows: &[Row],
        columns: &BulkUpsertColumns,
        retry: Option<&RetrySettings>,
    ) -> ClusterResult<()> {
        self.with_driver_retry(retry, |attempt| {
            let mut state = self.state.lock();
            self.record(
                &mut state,
                Call::BulkUpsert {
                    path: path.to_string(),
                    rows: rows.len(),
                    driver_retry: retry.is_some(),
                    attempt,
                },
            );
            state.take_failure(Operation::BulkUpsert)?;
            self.upsert_rows(&mut state, path, rows, columns)
        })
    }

    fn remove_directory(&self, path: &str) -> ClusterResult<()> {
        let mut state = self.state.lock();
        self.record(&mut state, Call::RemoveDirectory(path.to_string()));
        state.take_failure(Operation::RemoveDirectory)?;
        if path == self.root {
            return Err(ClusterError::scheme("Cannot remove the database root"));
        }
        self.drop_node(
            &mut state,
            path,
            |t| t == SchemeEntryType::Directory,
            "directory",
        )
    }

    fn describe_path(&self, path: &str) -> ClusterResult<Option<SchemeEntry>> {
        let mut state = self.state.lock();
        self.record(&mut state, Call::DescribePath(path.to_string()));
        state.take_failure(Operation::DescribePath)?;
        let node = state
            .catalog
            .get(path)
            .ok_or_else(|| ClusterError::scheme(format!("Path not found: {}", path)))?;
        let name = path.rsplit('/').next().unwrap_or(path);
        Ok(Some(SchemeEntry::new(name, node.entry_type)))
    }

    fn list_directory(&self, path: &str) -> ClusterResult<Vec<SchemeEntry>> {
        let mut state = self.state.lock();
        self.record(&mut state, Call::ListDirectory(path.to_string()));
        state.take_failure(Operation::ListDirectory)?;
        match state.catalog.get(path) {
            Some(node) if node.is_container() => Ok(state.children(path)),
            Some(node) => Err(ClusterError::scheme(format!(
                "Path {} is a {:?}, not a directory",
                path, node.entry_type
            ))),
            None => Err(ClusterError::scheme(format!("Path not found: {}", path))),
        }
    }

    fn describe_table(&self, path: &str) -> ClusterResult<TableDescription> {
        let mut state = self.state.lock();
        self.record(&mut state, Call::DescribeTable(path.to_string()));
        state.take_failure(Operation::DescribeTable)?;
        match state.catalog.get(path) {
            Some(node)
                if matches!(
                    node.entry_type,
                    SchemeEntryType::Table | SchemeEntryType::ColumnTable
                ) =>
            {
                Ok(TableDescription {
                    path: path.to_string(),
                    entry_type: node.entry_type,
                    schema: node.schema.clone().unwrap_or_default(),
                })
            }
            Some(_) => Err(ClusterError::scheme(format!("{} is not a table", path))),
            None => Err(ClusterError::scheme(format!("Path not found: {}", path))),
        }
    }

    fn check_alive(&self, timeout: Duration) -> Option<String> {
        debug!(timeout_ms = timeout.as_millis() as u64, "Liveness probe");
        self.state.lock().liveness.clone()
    }
}

/// Query pool handed out by [`MemoryCluster`]; logs its release on drop.
struct MemoryQueryPool<'a> {
    cluster: &'a MemoryCluster,
}

impl QuerySessionPool for MemoryQueryPool<'_> {
    fn execute_with_retries(
        &self,
        yql: &str,
        settings: &RetrySettings,
    ) -> ClusterResult<Vec<ResultSet>> {
        self.cluster.with_driver_retry(Some(settings), |attempt| {
            let mut state = self.cluster.state.lock();
            self.cluster.record(
                &mut state,
                Call::Query {
                    yql: yql.to_string(),
                    attempt,
                },
            );
            state.take_failure(Operation::Query)?;
            Ok(state.query_results.pop_front().unwrap_or_default())
        })
    }
}

impl Drop for MemoryQueryPool<'_> {
    fn drop(&mut self) {
        let mut state = self.cluster.state.lock();
        self.cluster.record(&mut state, Call::PoolReleased);
    }
}

// Statement parsing

#[derive(Debug)]
enum Ddl {
    CreateTable {
        path: String,
        schema: Schema,
        kind: SchemeEntryType,
    },
    CreateTableStore {
        path: String,
        schema: Schema,
    },
    CreateExternalDataSource {
        path: String,
    },
    DropTable {
        path: String,
    },
    DropTableStore {
        path: String,
    },
    DropExternalDataSource {
        path: String,
    },
}

fn generic(message: impl Into<String>) -> ClusterError {
    ClusterError::new(StatusCode::GenericError, message)
}

fn parse_ddl(yql: &str) -> ClusterResult<Ddl> {
    let head = yql
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    let (path, rest) = quoted(yql).ok_or_else(|| generic("Statement has no quoted path"))?;
    let path = path.to_string();

    let ddl = if head.starts_with("CREATE TABLESTORE ") {
        Ddl::CreateTableStore {
            path,
            schema: parse_schema(rest)?,
        }
    } else if head.starts_with("CREATE TABLE ") {
        let kind = if rest.to_ascii_uppercase().contains("STORE = COLUMN") {
            SchemeEntryType::ColumnTable
        } else {
            SchemeEntryType::Table
        };
        Ddl::CreateTable {
            path,
            schema: parse_schema(rest)?,
            kind,
        }
    } else if head.starts_with("CREATE EXTERNAL DATA SOURCE ") {
        Ddl::CreateExternalDataSource { path }
    } else if head.starts_with("DROP TABLESTORE ") {
        Ddl::DropTableStore { path }
    } else if head.starts_with("DROP TABLE ") {
        Ddl::DropTable { path }
    } else if head.starts_with("DROP EXTERNAL DATA SOURCE ") {
        Ddl::DropExternalDataSource { path }
    } else {
        return Err(generic(format!("Unsupported statement: {}", head)));
    };
    Ok(ddl)
}

/// `SELECT count(*) FROM `path``, returning the path.
fn parse_count_query(yql: &str) -> Option<&str> {
    let normalized = yql.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized
        .to_ascii_uppercase()
        .starts_with("SELECT COUNT(*) FROM `")
    {
        return None;
    }
    let (path, rest) = quoted(yql)?;
    rest.trim().trim_end_matches(';').is_empty().then_some(path)
}

/// First backtick-quoted name and the text after it.
fn quoted(text: &str) -> Option<(&str, &str)> {
    let start = text.find('`')? + 1;
    let len = text[start..].find('`')?;
    Some((&text[start..start + len], &text[start + len + 1..]))
}

/// Contents of the first balanced parenthesis group.
fn parenthesized(text: &str) -> Option<&str> {
    let open = text.find('(')?;
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(body[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_schema(text: &str) -> ClusterResult<Schema> {
    let body = parenthesized(text).ok_or_else(|| generic("Missing column list"))?;
    let mut schema = Schema::new();
    for part in split_top_level(body) {
        let upper = part.to_ascii_uppercase();
        if upper.starts_with("PRIMARY KEY") {
            let keys = parenthesized(part).ok_or_else(|| generic("Malformed PRIMARY KEY"))?;
            schema = schema.with_key_columns(
                keys.split(',').map(str::trim).filter(|k| !k.is_empty()),
            );
        } else if upper.starts_with("FAMILY ") {
            schema.column_families.push(parse_family(part)?);
        } else {
            schema.columns.push(parse_column(part)?);
        }
    }
    Ok(schema)
}

fn parse_column(definition: &str) -> ClusterResult<Column> {
    let tokens: Vec<&str> = definition.split_whitespace().collect();
    let (name, type_name) = match tokens.as_slice() {
        [name, type_name, ..] => (*name, *type_name),
        _ => return Err(generic(format!("Malformed column: {}", definition))),
    };
    let column_type: PrimitiveType = type_name.parse().map_err(generic)?;

    let mut column = Column::new(name, column_type);
    let mut rest = tokens[2..].iter();
    while let Some(token) = rest.next() {
        match token.to_ascii_uppercase().as_str() {
            "FAMILY" => {
                let family = rest
                    .next()
                    .ok_or_else(|| generic(format!("Missing family name: {}", definition)))?;
                column = column.in_family(*family);
            }
            "NOT" if rest.next().is_some_and(|t| t.eq_ignore_ascii_case("NULL")) => {
                column = column.not_null();
            }
            "NULL" => {}
            other => {
                return Err(generic(format!(
                    "Unexpected token {} in column {}",
                    other, name
                )))
            }
        }
    }
    Ok(column)
}

fn parse_family(definition: &str) -> ClusterResult<ColumnFamily> {
    let name = definition
        .split_whitespace()
        .nth(1)
        .map(|n| n.trim_end_matches('('))
        .ok_or_else(|| generic(format!("Malformed family: {}", definition)))?;

    let mut compression = Compression::Off;
    let mut level = None;
    for setting in parenthesized(definition).unwrap_or("").split(',') {
        let Some((key, value)) = setting.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_uppercase().as_str() {
            "COMPRESSION" => {
                compression = match value.to_ascii_uppercase().as_str() {
                    "OFF" => Compression::Off,
                    "LZ4" => Compression::Lz4,
                    "ZSTD" => Compression::Zstd,
                    other => return Err(generic(format!("Unknown compression {}", other))),
                }
            }
            "COMPRESSION_LEVEL" => {
                level = Some(
                    value
                        .parse::<i32>()
                        .map_err(|e| generic(format!("Bad compression level: {}", e)))?,
                )
            }
            other => return Err(generic(format!("Unknown family setting {}", other))),
        }
    }
    Ok(ColumnFamily::new(name, compression, level))
}

fn check_table_schema(schema: &Schema, kind: SchemeEntryType) -> ClusterResult<()> {
    schema
        .validate()
        .map_err(|e| ClusterError::scheme(e.to_string()))?;
    if schema.key_columns.is_empty() {
        return Err(ClusterError::scheme("Primary key is required"));
    }
    if kind != SchemeEntryType::Table {
        for key in &schema.key_columns {
            if schema.column(key).is_some_and(|c| !c.not_null) {
                return Err(ClusterError::scheme(format!(
                    "Key column {} must be NOT NULL in a column table",
                    key
                )));
            }
        }
    }
    Ok(())
}

fn check_bulk_columns(schema: &Schema, columns: &BulkUpsertColumns) -> ClusterResult<()> {
    for (name, column_type) in columns.iter() {
        let column = schema
            .column(name)
            .ok_or_else(|| ClusterError::scheme(format!("Unknown column: {}", name)))?;
        if column.column_type != column_type.primitive() {
            return Err(ClusterError::scheme(format!(
                "Type mismatch for column {}: table has {}, request has {}",
                name,
                column.column_type,
                column_type.primitive()
            )));
        }
    }
    for key in &schema.key_columns {
        if columns.get(key).is_none() {
            return Err(ClusterError::scheme(format!("Missing key column: {}", key)));
        }
    }
    Ok(())
}
