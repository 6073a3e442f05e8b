//! Render command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use sth_core::query::{CreateTable, Statement, TableKind};
use sth_core::schema::Schema;
use sth_core::{Config, PathResolver, TestContext};
use tracing::debug;

/// Table settings given on the command line.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub table: String,
    pub kind: TableKind,
    pub partition_by: Vec<String>,
    pub min_partitions: Option<u64>,
    pub suite: Option<String>,
    pub test: Option<String>,
}

/// Read a TOML schema file and render its `CREATE TABLE` statement.
pub fn run(config: &Config, schema_path: &Path, options: RenderOptions) -> Result<String> {
    let content = std::fs::read_to_string(schema_path)
        .with_context(|| format!("Failed to read schema file {}", schema_path.display()))?;
    let schema: Schema = toml::from_str(&content)
        .with_context(|| format!("Failed to parse schema file {}", schema_path.display()))?;
    schema.validate()?;

    let context = match (options.suite, options.test) {
        (None, None) => None,
        (suite, test) => Some(TestContext::new(
            suite.unwrap_or_default(),
            test.unwrap_or_default(),
        )),
    };
    let resolver = PathResolver::from_config(&config.cluster, context);

    let mut statement = CreateTable::new(options.table)
        .with_schema(schema)
        .with_kind(options.kind)
        .with_partition_by(options.partition_by);
    if let Some(count) = options.min_partitions {
        statement = statement.with_min_partitions(count);
    }

    debug!(title = %statement.title(), "Rendering statement");
    Ok(statement.to_yql(&resolver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCHEMA: &str = r#"
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
compression = "LZ4"
"#;

    fn schema_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    fn options(kind: TableKind) -> RenderOptions {
        RenderOptions {
            table: "table".to_string(),
            kind,
            partition_by: vec!["id".to_string()],
            min_partitions: Some(4),
            suite: Some("TestSuite".to_string()),
            test: Some("test_render".to_string()),
        }
    }

    #[test]
    fn test_render_column_table() {
        let file = schema_file(SCHEMA);
        let config = Config::for_database("local");

        let yql = run(&config, file.path(), options(TableKind::Column)).unwrap();
        assert_eq!(
            yql,
            "CREATE TABLE `/local/TestSuite/test_render/table` (\n    \
             id Int32 NOT NULL,\n    \
             level Uint32 FAMILY family1,\n    \
             PRIMARY KEY (id),\n    \
             FAMILY family1 (COMPRESSION = \"LZ4\")\n)\n\
             PARTITION BY HASH(id)\n\
             WITH (STORE = COLUMN, AUTO_PARTITIONING_MIN_PARTITIONS_COUNT = 4)"
        );
    }

    #[test]
    fn test_render_row_table() {
        let file = schema_file(SCHEMA);
        let config = Config::for_database("local");
        let mut opts = options(TableKind::Row);
        opts.partition_by.clear();
        opts.min_partitions = None;

        let yql = run(&config, file.path(), opts).unwrap();
        assert!(yql.ends_with("\nWITH (STORE = ROW)"));
        assert!(!yql.contains("PARTITION BY"));
    }

    #[test]
    fn test_render_rejects_undeclared_key() {
        let file = schema_file(&SCHEMA.replace("[\"id\"]", "[\"missing\"]"));
        let config = Config::for_database("local");

        assert!(run(&config, file.path(), options(TableKind::Column)).is_err());
    }

    #[test]
    fn test_render_missing_file() {
        let config = Config::for_database("local");
        let result = run(
            &config,
            Path::new("/nonexistent/schema.toml"),
            options(TableKind::Column),
        );
        assert!(result.is_err());
    }
}
