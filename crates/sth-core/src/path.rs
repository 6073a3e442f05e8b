//! Per-test path namespacing.
//!
//! Every object a scenario creates lives under
//! `/{database}/{tables_path}/{suite}/{test}/...`, so parallel runs never
//! collide on object names.

use crate::config::ClusterConfig;

/// Identifies the running scenario test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    /// Suite name (scenario suite type name)
    pub suite: String,
    /// Test name (scenario function name without its prefix)
    pub test: String,
}

impl TestContext {
    pub fn new(suite: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            test: test.into(),
        }
    }
}

/// Computes absolute cluster paths from relative names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    database: String,
    tables_path: String,
    context: Option<TestContext>,
}

impl PathResolver {
    pub fn new(
        database: impl Into<String>,
        tables_path: impl Into<String>,
        context: Option<TestContext>,
    ) -> Self {
        Self {
            database: database.into(),
            tables_path: tables_path.into(),
            context,
        }
    }

    pub fn from_config(config: &ClusterConfig, context: Option<TestContext>) -> Self {
        Self::new(&config.database, &config.tables_path, context)
    }

    pub fn context(&self) -> Option<&TestContext> {
        self.context.as_ref()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Full path of `path` inside the current test's namespace.
    pub fn resolve(&self, path: &str) -> String {
        let mut segments = vec![format!("/{}", self.database.trim_matches('/'))];
        push_not_empty(&mut segments, &self.tables_path);
        if let Some(ctx) = &self.context {
            push_not_empty(&mut segments, &ctx.suite);
            push_not_empty(&mut segments, &ctx.test);
        }
        push_not_empty(&mut segments, path);
        segments.join("/")
    }
}

fn push_not_empty(segments: &mut Vec<String>, segment: &str) {
    let segment = segment.trim_matches('/');
    if !segment.is_empty() {
        segments.push(segment.to_string());
    }
}

/// Join two path fragments with a single `/`, dropping empty sides.
///
/// `path` is always taken relative to `base`: a leading `/` does not make
/// it absolute, so nothing joined here can leave the test namespace.
pub fn join(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path)
}
