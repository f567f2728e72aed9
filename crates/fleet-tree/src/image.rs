use std::collections::BTreeMap;

use crate::filter::Filter;
use crate::inode::ComputedInode;
use crate::tree::FileSystemTree;

/// Desired state for a machine: a tree, path exclusion rules, and the
/// computed-file specifications keyed by target path.
///
/// Computed specs describe files that the receiving machine must generate
/// itself; their content hash is only known after local generation.
#[derive(Clone, Debug)]
pub struct Image {
    pub tree: FileSystemTree,
    pub filter: Filter,
    pub computed_specs: BTreeMap<String, ComputedInode>,
}

impl Image {
    /// An image with no exclusions and no computed files.
    pub fn new(tree: FileSystemTree) -> Self {
        Self {
            tree,
            filter: Filter::empty(),
            computed_specs: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_computed_spec(mut self, path: &str, spec: ComputedInode) -> Self {
        self.computed_specs.insert(path.to_string(), spec);
        self
    }
}
