//! Resolve command implementation.

use sth_core::{Config, PathResolver, TestContext};

/// Absolute cluster path of `path` under the configured namespace.
///
/// A suite or test name switches on per-test namespacing; a missing half
/// of the pair is taken as empty.
pub fn run(config: &Config, path: &str, suite: Option<String>, test: Option<String>) -> String {
    let context = match (suite, test) {
        (None, None) => None,
        (suite, test) => Some(TestContext::new(
            suite.unwrap_or_default(),
            test.unwrap_or_default(),
        )),
    };
    PathResolver::from_config(&config.cluster, context).resolve(path)
}
