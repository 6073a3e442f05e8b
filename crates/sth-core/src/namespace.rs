//! Namespace reconciler: recursive discovery and removal of catalog entries.
//!
//! ## Removal order
//!
//! Listing a container yields its descendants leaves-first so that each
//! entry can be dropped after everything it contains:
//!
//! 1. **Discover**: walk the tree depth-first, parents before children
//! 2. **Rank**: column tables, then column stores, then external data
//!    sources, then everything else
//! 3. **Reverse**: inside a rank, later discoveries come first
//! 4. **Root**: the listed path itself comes last
//!
//! The `.sys` system directory is never listed.

use crate::cluster::{Cluster, SchemeEntry, SchemeEntryType};
use crate::path::{self, PathResolver};
use crate::query::{DropExternalDataSource, DropTable, DropTableStore, Statement};
use crate::{Error, Result};
use std::cmp::Reverse;
use tracing::{debug, info};

/// Name of the per-directory system view folder.
pub const SYS_DIRECTORY: &str = ".sys";

/// Removal priority of an entry kind; lower is removed first.
pub fn deletion_rank(kind: SchemeEntryType) -> u8 {
    match kind {
        SchemeEntryType::ColumnTable => 0,
        SchemeEntryType::ColumnStore => 1,
        SchemeEntryType::ExternalDataSource => 2,
        _ => 3,
    }
}

/// How one listed entry is removed.
#[derive(Debug)]
pub enum Removal {
    /// Drop statement, with a name relative to the test namespace
    Drop(Box<dyn Statement>),
    /// Direct directory removal, by absolute path
    RemoveDirectory(String),
}

/// Reads the catalog under a resolver's namespace.
pub struct Namespace<'a> {
    cluster: &'a dyn Cluster,
    resolver: &'a PathResolver,
}

impl<'a> Namespace<'a> {
    pub fn new(cluster: &'a dyn Cluster, resolver: &'a PathResolver) -> Self {
        Self { cluster, resolver }
    }

    /// Entries at `folder/path`, leaves first and `path` itself last.
    ///
    /// Names in the result are relative to `folder`. A path that does not
    /// exist yields an empty list. `path` and `folder` are both relative to
    /// the namespace; a leading `/` is ignored.
    pub fn list_path(&self, path: &str, folder: &str) -> Result<Vec<SchemeEntry>> {
        let root = self.resolver.resolve(folder);
        let target = path::join(&root, path);

        let described = match self.cluster.describe_path(&target) {
            Ok(entry) => entry,
            Err(err) if err.is_scheme_error() => {
                debug!(path = %target, "Path does not exist");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        let Some(entry) = described else {
            return Ok(Vec::new());
        };
        let this = SchemeEntry::new(path.trim_matches('/'), entry.entry_type);

        if !this.is_container() {
            return Ok(vec![this]);
        }

        let mut discovered = Vec::new();
        self.collect(&root, &this.name, &mut discovered)?;

        let mut ordered: Vec<(usize, SchemeEntry)> = discovered.into_iter().enumerate().collect();
        ordered.sort_by_key(|(index, entry)| (deletion_rank(entry.entry_type), Reverse(*index)));

        let mut entries: Vec<SchemeEntry> = ordered.into_iter().map(|(_, e)| e).collect();
        entries.push(this);

        debug!(path = %target, entries = entries.len(), "Listed path");
        Ok(entries)
    }

    /// Depth-first walk below `root/relative`, parents before children.
    fn collect(&self, root: &str, relative: &str, out: &mut Vec<SchemeEntry>) -> Result<()> {
        let children = self.cluster.list_directory(&path::join(root, relative))?;
        for child in children {
            if child.name == SYS_DIRECTORY {
                continue;
            }
            let name = path::join(relative, &child.name);
            let entry = SchemeEntry::new(name, child.entry_type);
            let descend = entry.is_container();
            out.push(entry.clone());
            if descend {
                self.collect(root, &entry.name, out)?;
            }
        }
        Ok(())
    }

    /// How to remove `entry`, listed under `folder`.
    pub fn removal_for(&self, entry: &SchemeEntry, folder: &str) -> Result<Removal> {
        let name = path::join(folder, &entry.name);
        let removal = if entry.is_any_table() {
            Removal::Drop(Box::new(DropTable::new(name)))
        } else if entry.is_column_store() {
            Removal::Drop(Box::new(DropTableStore::new(name)))
        } else if entry.is_external_data_source() {
            Removal::Drop(Box::new(DropExternalDataSource::new(name)))
        } else if entry.is_directory() {
            // Includes the database root itself, which the cluster refuses.
            Removal::RemoveDirectory(self.resolver.resolve(&name))
        } else {
            let path = path::join(&self.resolver.resolve(folder), &entry.name);
            info!(path = %path, kind = ?entry.entry_type, "Unsupported entry kind");
            return Err(Error::UnsupportedEntry {
                path,
                kind: entry.entry_type,
            });
        };
        Ok(removal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::{Call, MemoryCluster, Operation};
    use crate::error::ClusterError;
    use crate::path::TestContext;
    use crate::status::StatusCode;

    fn setup() -> (MemoryCluster, PathResolver) {
        let cluster = MemoryCluster::new("local");
        let resolver = PathResolver::new("local", "", Some(TestContext::new("S", "T")));
        (cluster, resolver)
    }

    fn names(entries: &[SchemeEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_deletion_rank() {
        assert!(deletion_rank(SchemeEntryType::ColumnTable) < deletion_rank(SchemeEntryType::ColumnStore));
        assert!(
            deletion_rank(SchemeEntryType::ColumnStore)
                < deletion_rank(SchemeEntryType::ExternalDataSource)
        );
        assert_eq!(deletion_rank(SchemeEntryType::Table), deletion_rank(SchemeEntryType::Directory));
    }

    #[test]
    fn test_list_missing_path() {
        let (cluster, resolver) = setup();
        let ns = Namespace::new(&cluster, &resolver);
        assert!(ns.list_path("nothing", "").unwrap().is_empty());
    }

    #[test]
    fn test_list_single_entry() {
        let (cluster, resolver) = setup();
        cluster
            .insert_entry("/local/S/T/t", SchemeEntryType::ColumnTable)
            .unwrap();
        let ns = Namespace::new(&cluster, &resolver);

        let entries = ns.list_path("t", "").unwrap();
        assert_eq!(entries, vec![SchemeEntry::new("t", SchemeEntryType::ColumnTable)]);
    }

    #[test]
    fn test_list_orders_leaves_first() {
        let (cluster, resolver) = setup();
        cluster.mkdir("/local/S/T/dir/sub/inner").unwrap();
        cluster
            .insert_entry("/local/S/T/dir/table", SchemeEntryType::Table)
            .unwrap();
        let ns = Namespace::new(&cluster, &resolver);

        let entries = ns.list_path("dir", "").unwrap();
        assert_eq!(
            names(&entries),
            vec!["dir/table", "dir/sub/inner", "dir/sub", "dir"]
        );
    }

    #[test]
    fn test_list_ranks_kinds() {
        let (cluster, resolver) = setup();
        cluster.mkdir("/local/S/T/dir/a_sub").unwrap();
        cluster
            .insert_entry("/local/S/T/dir/b_src", SchemeEntryType::ExternalDataSource)
            .unwrap();
        cluster
            .insert_entry("/local/S/T/dir/c_store", SchemeEntryType::ColumnStore)
            .unwrap();
        cluster
            .insert_entry("/local/S/T/dir/c_store/t1", SchemeEntryType::ColumnTable)
            .unwrap();
        cluster
            .insert_entry("/local/S/T/dir/d_table", SchemeEntryType::ColumnTable)
            .unwrap();
        let ns = Namespace::new(&cluster, &resolver);

        let entries = ns.list_path("dir", "").unwrap();
        assert_eq!(
            names(&entries),
            vec![
                "dir/d_table",
                "dir/c_store/t1",
                "dir/c_store",
                "dir/b_src",
                "dir/a_sub",
                "dir"
            ]
        );
    }

    #[test]
    fn test_list_names_relative_to_folder() {
        let (cluster, resolver) = setup();
        cluster
            .insert_entry("/local/S/T/base/dir/t", SchemeEntryType::ColumnTable)
            .unwrap();
        let ns = Namespace::new(&cluster, &resolver);

        let entries = ns.list_path("dir", "base").unwrap();
        assert_eq!(names(&entries), vec!["dir/t", "dir"]);
    }

    #[test]
    fn test_list_leading_slash_stays_in_namespace() {
        let (cluster, resolver) = setup();
        cluster
            .insert_entry("/local/S/T/dir/t", SchemeEntryType::ColumnTable)
            .unwrap();
        let ns = Namespace::new(&cluster, &resolver);

        let entries = ns.list_path("/dir", "").unwrap();
        assert_eq!(names(&entries), vec!["dir/t", "dir"]);
        assert!(cluster
            .calls()
            .iter()
            .all(|c| !matches!(c, Call::DescribePath(p) if p == "/dir")));
    }

    #[test]
    fn test_list_skips_sys() {
        let cluster = MemoryCluster::new("local");
        cluster.insert_entry("/local/t", SchemeEntryType::ColumnTable).unwrap();
        let resolver = PathResolver::new("local", "", None);
        let ns = Namespace::new(&cluster, &resolver);

        let entries = ns.list_path("", "").unwrap();
        assert_eq!(names(&entries), vec!["t", ""]);
        assert_eq!(entries[1].entry_type, SchemeEntryType::Database);
    }

    #[test]
    fn test_list_propagates_other_errors() {
        let (cluster, resolver) = setup();
        cluster.fail_next(
            Operation::DescribePath,
            ClusterError::new(StatusCode::Unavailable, "no route"),
        );
        let ns = Namespace::new(&cluster, &resolver);

        assert!(matches!(ns.list_path("x", ""), Err(Error::Cluster(_))));
    }

    #[test]
    fn test_removal_dispatch() {
        let (cluster, resolver) = setup();
        let ns = Namespace::new(&cluster, &resolver);

        let drop = ns
            .removal_for(&SchemeEntry::new("dir/t", SchemeEntryType::Table), "base")
            .unwrap();
        match drop {
            Removal::Drop(stmt) => {
                assert_eq!(stmt.to_yql(&resolver), "DROP TABLE `/local/S/T/base/dir/t`")
            }
            other => panic!("unexpected removal: {:?}", other),
        }

        let dir = ns
            .removal_for(&SchemeEntry::new("dir", SchemeEntryType::Directory), "base")
            .unwrap();
        assert!(matches!(dir, Removal::RemoveDirectory(ref p) if p == "/local/S/T/base/dir"));

        let err = ns
            .removal_for(&SchemeEntry::new("dir/topic", SchemeEntryType::Topic), "base")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot remove type Topic for path /local/S/T/base/dir/topic"
        );
    }
}
