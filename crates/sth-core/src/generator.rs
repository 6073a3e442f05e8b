//! Data generation for bulk loads.

use crate::schema::{BulkUpsertColumns, Row, Schema};

/// Source of rows for a bulk load.
///
/// A generator is created for one load, driven until [`is_eof`] reports
/// exhaustion and then discarded.
///
/// [`is_eof`]: DataGenerator::is_eof
pub trait DataGenerator {
    /// Column types declared to the bulk-load API.
    fn bulk_upsert_columns(&self) -> BulkUpsertColumns;

    /// Produce up to `rows_count` rows; fewer is allowed.
    fn generate_data_portion(&mut self, rows_count: usize) -> Vec<Row>;

    /// True once every row has been produced.
    fn is_eof(&self) -> bool;
}

/// Hands out a fixed list of rows in order.
#[derive(Debug, Clone)]
pub struct ConstDataGenerator {
    columns: BulkUpsertColumns,
    rows: Vec<Row>,
    position: usize,
}

impl ConstDataGenerator {
    pub fn new(schema: &Schema, rows: Vec<Row>) -> Self {
        Self {
            columns: schema.build_bulk_columns_types(),
            rows,
            position: 0,
        }
    }
}

impl DataGenerator for ConstDataGenerator {
    fn bulk_upsert_columns(&self) -> BulkUpsertColumns {
        self.columns.clone()
    }

    fn generate_data_portion(&mut self, rows_count: usize) -> Vec<Row> {
        let end = self.rows.len().min(self.position + rows_count);
        let portion = self.rows[self.position..end].to_vec();
        self.position = end;
        portion
    }

    fn is_eof(&self) -> bool {
        self.position >= self.rows.len()
    }
}
