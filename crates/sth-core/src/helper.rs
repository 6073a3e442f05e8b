//! Scenario test helper facade.
//!
//! [`ScenarioTestHelper`] is what scenario tests talk to. It resolves names
//! into the test's namespace, renders statements, runs every remote call
//! through the [`Engine`] and reports each step as a `tracing` span.
//!
//! ```
//! use std::sync::Arc;
//! use sth_core::cluster::memory::MemoryCluster;
//! use sth_core::query::{CreateTable, DropTable};
//! use sth_core::schema::{Column, PrimitiveType, Schema};
//! use sth_core::{row, Config, ScenarioTestHelper, StatusCode, TestContext};
//!
//! let schema = Schema::new()
//!     .with_column(Column::new("id", PrimitiveType::Int32).not_null())
//!     .with_column(Column::new("level", PrimitiveType::Uint32))
//!     .with_key_columns(["id"]);
//!
//! let cluster = Arc::new(MemoryCluster::new("local"));
//! let sth = ScenarioTestHelper::new(
//!     cluster,
//!     &Config::for_database("local"),
//!     Some(TestContext::new("TestSuite", "simple")),
//! );
//!
//! sth.execute_scheme_query(&CreateTable::new("testTable").with_schema(schema.clone()))?;
//! sth.bulk_upsert_data(
//!     "testTable",
//!     &schema,
//!     vec![row! { "id" => 1, "level" => 3u32 }, row! { "id" => 2, "level" => None::<u32> }],
//!     StatusCode::Success,
//!     "with ok scheme",
//! )?;
//! assert_eq!(sth.get_table_rows_count("testTable")?, 2);
//! sth.execute_scheme_query(&DropTable::new("testTable"))?;
//! # Ok::<(), sth_core::Error>(())
//! ```

use crate::cluster::{Cluster, ResultSet, RetrySettings, SchemeEntry, TableDescription};
use crate::config::{Config, ExecutionConfig};
use crate::engine::{Engine, RunOutcome, RunPolicy, Sleeper};
use crate::generator::{ConstDataGenerator, DataGenerator};
use crate::namespace::{Namespace, Removal};
use crate::path::{PathResolver, TestContext};
use crate::query::Statement;
use crate::schema::{Row, Schema};
use crate::status::{StatusCode, StatusSet};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, trace};

/// Entry point for scenario tests.
pub struct ScenarioTestHelper {
    cluster: Arc<dyn Cluster>,
    resolver: PathResolver,
    engine: Engine,
    execution: ExecutionConfig,
}

impl ScenarioTestHelper {
    /// Helper bound to `context`, talking to `cluster`.
    pub fn new(cluster: Arc<dyn Cluster>, config: &Config, context: Option<TestContext>) -> Self {
        Self {
            cluster,
            resolver: PathResolver::from_config(&config.cluster, context),
            engine: Engine::new(config.execution.retry_delay()),
            execution: config.execution.clone(),
        }
    }

    /// Replace how the engine waits between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.engine = self.engine.with_sleeper(sleeper);
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn cluster(&self) -> &dyn Cluster {
        self.cluster.as_ref()
    }

    /// Absolute path of `path` inside the test's namespace.
    pub fn get_full_path(&self, path: &str) -> String {
        self.resolver.resolve(path)
    }

    /// True when the cluster answers its liveness probe.
    pub fn check_if_ydb_alive(&self, timeout: Duration) -> bool {
        match self.cluster.check_alive(timeout) {
            None => true,
            Some(diagnostic) => {
                info!(diagnostic = %diagnostic, "Cluster is not alive");
                false
            }
        }
    }

    /// Policy for schema queries: `expected`, no retries, configured
    /// retriable set.
    pub fn scheme_policy(&self, expected: impl Into<StatusSet>) -> RunPolicy {
        RunPolicy::expect(expected).with_retriable(self.execution.retriable_statuses.clone())
    }

    /// Execute a schema statement expecting `SUCCESS`.
    pub fn execute_scheme_query(&self, statement: &dyn Statement) -> Result<()> {
        let policy = self.scheme_policy(StatusCode::Success);
        self.execute_scheme_query_with(statement, &policy, "")?;
        Ok(())
    }

    /// Execute a schema statement under `policy`.
    pub fn execute_scheme_query_with(
        &self,
        statement: &dyn Statement,
        policy: &RunPolicy,
        comment: &str,
    ) -> Result<RunOutcome<()>> {
        let title = format!("{} {}", statement.title(), comment);
        let _span = info_span!(
            "scheme_query",
            title = %title.trim_end(),
            params = ?statement.params(),
            expected = %policy.expected,
        )
        .entered();

        let yql = statement.to_yql(&self.resolver);
        info!(request = %yql, "request");
        self.engine.run(policy, || self.cluster.execute_scheme(&yql))
    }

    /// Run a scan query expecting `SUCCESS`, with the configured timeout.
    pub fn execute_scan_query(&self, yql: &str) -> Result<ResultSet> {
        let outcome =
            self.execute_scan_query_with(yql, StatusCode::Success, self.execution.scan_timeout())?;
        into_value(outcome, "scan query")
    }

    /// Run a scan query, concatenating every page into one result set.
    pub fn execute_scan_query_with(
        &self,
        yql: &str,
        expected: impl Into<StatusSet>,
        timeout: Option<Duration>,
    ) -> Result<RunOutcome<ResultSet>> {
        let policy = RunPolicy::expect(expected);
        let _span = info_span!("scan_query", expected = %policy.expected).entered();
        info!(request = %yql, "request");

        let outcome = self.engine.run(&policy, || {
            let mut combined: Option<ResultSet> = None;
            for page in self.cluster.scan_query(yql, timeout)? {
                let page = page?;
                match combined.as_mut() {
                    Some(result) => result.rows.extend(page.rows),
                    None => combined = Some(page),
                }
            }
            Ok(combined.unwrap_or_default())
        })?;

        if let RunOutcome::Success(result) = &outcome {
            debug!(rows = result.len(), result = %result.to_json_rows(), "result");
        }
        Ok(outcome)
    }

    /// Run a query expecting `SUCCESS`, without driver retries.
    pub fn execute_query(&self, yql: &str) -> Result<Vec<ResultSet>> {
        let outcome = self.execute_query_with(yql, &RunPolicy::expect(StatusCode::Success))?;
        into_value(outcome, "query")
    }

    /// Run a query through a session pool held for this call only.
    ///
    /// `policy.max_retries` is the driver's retry budget; the engine itself
    /// makes one attempt and applies the remaining policy to its result.
    pub fn execute_query_with(
        &self,
        yql: &str,
        policy: &RunPolicy,
    ) -> Result<RunOutcome<Vec<ResultSet>>> {
        let _span = info_span!("query", expected = %policy.expected).entered();
        info!(request = %yql, "request");

        let settings = RetrySettings::with_max_retries(policy.max_retries);
        let engine_policy = RunPolicy {
            max_retries: 0,
            ..policy.clone()
        };
        let pool = self.cluster.query_session_pool()?;
        self.engine
            .run(&engine_policy, || pool.execute_with_retries(yql, &settings))
    }

    /// Drop every name in `names`, tolerating ones that do not exist.
    pub fn drop_if_exist<S, F>(&self, names: &[&str], make_statement: F) -> Result<()>
    where
        S: Statement,
        F: Fn(&str) -> S,
    {
        let policy = self.scheme_policy([StatusCode::Success, StatusCode::SchemeError]);
        for &name in names {
            self.execute_scheme_query_with(&make_statement(name), &policy, "")?;
        }
        Ok(())
    }

    /// Load fixed rows described by `schema` into `table`.
    pub fn bulk_upsert_data(
        &self,
        table: &str,
        schema: &Schema,
        rows: Vec<Row>,
        expected: impl Into<StatusSet>,
        comment: &str,
    ) -> Result<()> {
        let expected = expected.into();
        let _span = info_span!(
            "bulk_upsert",
            title = %format!("Bulk upsert {}", comment).trim_end(),
            table,
            expected = %expected,
        )
        .entered();
        debug!(data = ?rows, "data");

        let mut generator = ConstDataGenerator::new(schema, rows);
        self.bulk_upsert_impl(table, &mut generator, &expected)
    }

    /// Load rows from `generator` into `table` until it is exhausted.
    pub fn bulk_upsert(
        &self,
        table: &str,
        generator: &mut dyn DataGenerator,
        expected: impl Into<StatusSet>,
        comment: &str,
    ) -> Result<()> {
        let expected = expected.into();
        let _span = info_span!(
            "bulk_upsert",
            title = %format!("Bulk upsert {}", comment).trim_end(),
            table,
            expected = %expected,
        )
        .entered();

        self.bulk_upsert_impl(table, generator, &expected)
    }

    fn bulk_upsert_impl(
        &self,
        table: &str,
        generator: &mut dyn DataGenerator,
        expected: &StatusSet,
    ) -> Result<()> {
        let full_path = self.get_full_path(table);
        let columns = generator.bulk_upsert_columns();
        let driver_retry = expected.is_success_only().then(RetrySettings::default);
        let policy = RunPolicy::expect(expected.clone());
        let batch_size = self.execution.bulk_upsert_batch_size.get();

        let mut batches = 0usize;
        while !generator.is_eof() {
            let data = generator.generate_data_portion(batch_size);
            if data.is_empty() && !generator.is_eof() {
                return Err(Error::InvalidResult(format!(
                    "data generator for {} returned no rows before its end",
                    full_path
                )));
            }
            trace!(rows = data.len(), data = ?data, "data");
            self.engine.run(&policy, || {
                self.cluster
                    .bulk_upsert(&full_path, &data, &columns, driver_retry.as_ref())
            })?;
            batches += 1;
        }

        debug!(table = %full_path, batches, "Bulk upsert finished");
        Ok(())
    }

    /// Number of rows in `table`.
    pub fn get_table_rows_count(&self, table: &str) -> Result<u64> {
        let _span = info_span!("rows_count", table).entered();
        let result = self.execute_scan_query(&format!(
            "SELECT count(*) FROM `{}`",
            self.get_full_path(table)
        ))?;
        result
            .scalar()
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::InvalidResult(format!("no row count for {}", table)))
    }

    /// Describe the table at `path`, relative to the test's namespace.
    pub fn describe_table(&self, path: &str) -> Result<TableDescription> {
        let _span = info_span!("describe_table", path).entered();
        let full_path = self.get_full_path(path);
        let outcome = self
            .engine
            .run(&RunPolicy::expect(StatusCode::Success), || {
                self.cluster.describe_table(&full_path)
            })?;
        into_value(outcome, "describe table")
    }

    /// Entries under `folder/path`, leaves first; empty when missing.
    pub fn list_path(&self, path: &str, folder: &str) -> Result<Vec<SchemeEntry>> {
        let _span = info_span!("list_path", path, folder).entered();
        self.namespace().list_path(path, folder)
    }

    /// Remove `folder/path` and everything below it.
    ///
    /// A missing path is not an error.
    pub fn remove_path(&self, path: &str, folder: &str) -> Result<()> {
        let _span = info_span!("remove_path", path, folder).entered();
        let namespace = self.namespace();

        for entry in namespace.list_path(path, folder)? {
            match namespace.removal_for(&entry, folder)? {
                Removal::Drop(statement) => self.execute_scheme_query(statement.as_ref())?,
                Removal::RemoveDirectory(full_path) => {
                    self.engine
                        .run(&RunPolicy::expect(StatusCode::Success), || {
                            self.cluster.remove_directory(&full_path)
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Raw and stored byte totals of the active portions of a column table.
    ///
    /// `table` may be absolute; `entity` restricts the sum to one column
    /// when not empty.
    pub fn get_volumes_columns(&self, table: &str, entity: &str) -> Result<(u64, u64)> {
        let path = if table.starts_with('/') {
            table.to_string()
        } else {
            self.get_full_path(table)
        };
        let mut query = format!(
            "SELECT * FROM `{}/.sys/primary_index_stats` WHERE Activity == 1",
            path
        );
        if !entity.is_empty() {
            query.push_str(&format!(" AND EntityName = \"{}\"", entity));
        }

        let result = self.execute_scan_query(&query)?;
        let mut raw_bytes = 0u64;
        let mut bytes = 0u64;
        for row in 0..result.len() {
            raw_bytes += column_u64(&result, row, "RawBytes")?;
            bytes += column_u64(&result, row, "BlobRangeSize")?;
        }
        Ok((raw_bytes, bytes))
    }

    fn namespace(&self) -> Namespace<'_> {
        Namespace::new(self.cluster.as_ref(), &self.resolver)
    }
}

fn into_value<T>(outcome: RunOutcome<T>, what: &str) -> Result<T> {
    match outcome {
        RunOutcome::Success(value) => Ok(value),
        other => Err(Error::InvalidResult(format!(
            "{} returned no value: {:?}",
            what,
            other.error()
        ))),
    }
}

fn column_u64(result: &ResultSet, row: usize, column: &str) -> Result<u64> {
    result
        .value(row, column)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| Error::InvalidResult(format!("row {} has no numeric {}", row, column)))
}
