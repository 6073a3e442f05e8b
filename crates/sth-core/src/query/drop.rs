use super::{quoted_path, Statement};
use crate::path::PathResolver;
use std::collections::BTreeMap;

/// `DROP TABLE`, for row and column tables alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    name: String,
}

impl DropTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Statement for DropTable {
    fn to_yql(&self, resolver: &PathResolver) -> String {
        format!("DROP TABLE {}", quoted_path(resolver, &self.name))
    }

    fn title(&self) -> String {
        "Drop table".to_string()
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("table".to_string(), self.name.clone())])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTableStore {
    name: String,
}

impl DropTableStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Statement for DropTableStore {
    fn to_yql(&self, resolver: &PathResolver) -> String {
        format!("DROP TABLESTORE {}", quoted_path(resolver, &self.name))
    }

    fn title(&self) -> String {
        "Drop tablestore".to_string()
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("tablestore".to_string(), self.name.clone())])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropExternalDataSource {
    name: String,
}

impl DropExternalDataSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Statement for DropExternalDataSource {
    fn to_yql(&self, resolver: &PathResolver) -> String {
        format!("DROP EXTERNAL DATA SOURCE {}", quoted_path(resolver, &self.name))
    }

    fn title(&self) -> String {
        "Drop external data source".to_string()
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("data_source".to_string(), self.name.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::TestContext;

    fn resolver() -> PathResolver {
        PathResolver::new("local", "", Some(TestContext::new("Suite", "drop")))
    }

    #[test]
    fn test_drop_statements_render() {
        let r = resolver();
        assert_eq!(
            DropTable::new("t").to_yql(&r),
            "DROP TABLE `/local/Suite/drop/t`"
        );
        assert_eq!(
            DropTableStore::new("store").to_yql(&r),
            "DROP TABLESTORE `/local/Suite/drop/store`"
        );
        assert_eq!(
            DropExternalDataSource::new("dir/s3").to_yql(&r),
            "DROP EXTERNAL DATA SOURCE `/local/Suite/drop/dir/s3`"
        );
    }

    #[test]
    fn test_drop_params() {
        let stmt = DropTable::new("t");
        assert_eq!(stmt.title(), "Drop table");
        assert_eq!(stmt.params().get("table").map(String::as_str), Some("t"));
    }
}
