//! Statements: schema mutations rendered to executable YQL.

mod drop;
mod table;

pub use drop::{DropExternalDataSource, DropTable, DropTableStore};
pub use table::{CreateTable, CreateTableStore, TableKind};

use crate::path::PathResolver;
use std::collections::BTreeMap;
use std::fmt;

/// A schema mutation the helper can execute.
///
/// Statements hold relative names; the resolver passed to
/// [`to_yql`](Statement::to_yql) places them inside the running test's
/// namespace.
pub trait Statement: fmt::Debug {
    /// Executable statement text.
    fn to_yql(&self, resolver: &PathResolver) -> String;

    /// Short human-readable title for step reporting.
    fn title(&self) -> String;

    /// Display parameters for step reporting.
    fn params(&self) -> BTreeMap<String, String>;
}

/// Backtick-quoted absolute path of `name`.
pub(crate) fn quoted_path(resolver: &PathResolver, name: &str) -> String {
    format!("`{}`", resolver.resolve(name))
}
