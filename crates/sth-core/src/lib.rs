//! STH Core - scenario test helper for a distributed tabular database
//!
//! This library gives integration test suites a deterministic, retry-aware
//! way to drive a cluster under test:
//!
//! - A schema DSL rendered to `CREATE`/`DROP` statements
//! - A status-driven execution engine with expected and retriable sets
//! - Per-test path namespacing
//! - Leaves-first discovery and removal of nested catalog entries
//! - Bulk loading from pluggable data generators

pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod helper;
pub mod namespace;
pub mod path;
pub mod query;
pub mod schema;
pub mod status;

// Re-export commonly used types
pub use cluster::{Cluster, ResultSet, RetrySettings, SchemeEntry, SchemeEntryType};
pub use config::Config;
pub use engine::{Engine, RunOutcome, RunPolicy};
pub use error::{ClusterError, ClusterResult, Outcome};
pub use error::{Error, Result};
pub use generator::{ConstDataGenerator, DataGenerator};
pub use helper::ScenarioTestHelper;
pub use path::{PathResolver, TestContext};
pub use status::{StatusCode, StatusSet};
