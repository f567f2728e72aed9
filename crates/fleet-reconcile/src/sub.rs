use std::collections::BTreeMap;
use std::fmt;

use fleet_tree::{FileSystemTree, ObjectCache, RegularInode};

/// One machine's transient reconciliation context.
///
/// Binds together the live tree and object cache produced by the last
/// scan and the computed-file contents resolved for this machine by the
/// external generator. Built fresh for each reconciliation pass, never
/// persisted.
pub struct Sub<'a> {
    pub hostname: &'a str,
    /// Live filesystem snapshot.
    pub tree: &'a FileSystemTree,
    /// Objects the machine physically holds.
    pub object_cache: &'a ObjectCache,
    /// Resolved computed content per target path. A desired computed
    /// path absent from this map is a "missing computed file".
    pub computed_inodes: &'a BTreeMap<String, RegularInode>,
}

impl fmt::Display for Sub<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hostname)
    }
}
