use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fleet_types::ObjectHash;

use crate::tree::FileSystemTree;

/// The objects a machine physically holds locally, keyed by hash.
///
/// Populated by the scanner alongside the tree snapshot; independent of
/// whether any inode currently references a given hash.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCache {
    objects: BTreeMap<ObjectHash, u64>,
}

impl ObjectCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cache from every regular inode of a tree.
    pub fn from_tree(tree: &FileSystemTree) -> Self {
        let mut cache = Self::new();
        for entry in tree.walk() {
            if let crate::inode::Inode::Regular(inode) = entry.inode {
                cache.insert(inode.hash, inode.size);
            }
        }
        cache
    }

    /// Record that `hash` is held locally with the given size.
    pub fn insert(&mut self, hash: ObjectHash, size: u64) {
        self.objects.insert(hash, size);
    }

    /// Returns `true` when `hash` is held locally.
    pub fn contains(&self, hash: &ObjectHash) -> bool {
        self.objects.contains_key(hash)
    }

    /// Size of the cached object, if present.
    pub fn size_of(&self, hash: &ObjectHash) -> Option<u64> {
        self.objects.get(hash).copied()
    }

    /// Number of distinct hashes held.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` when no objects are held.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
