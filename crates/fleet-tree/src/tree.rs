use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use fleet_types::ObjectHash;

use crate::error::{TreeError, TreeResult};
use crate::inode::{ComputedInode, DirectoryInode, Inode, RegularInode, SpecialInode, SymlinkInode};

/// Inode number of the root directory in every tree.
pub const ROOT_INODE: u64 = 1;

/// An immutable, hash-annotated snapshot of a directory tree.
///
/// Inodes are keyed by numeric id; directory entries are keyed by name.
/// A scan produces a complete new tree rather than mutating an old one,
/// so a tree handed to a reconciliation pass never changes underneath it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemTree {
    inodes: BTreeMap<u64, Inode>,
    root: u64,
}

/// One step of a deterministic tree walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkEntry<'a> {
    /// Absolute path from the tree root, e.g. `/etc/passwd`.
    pub path: String,
    /// Inode number within this tree.
    pub inode_number: u64,
    pub inode: &'a Inode,
}

impl FileSystemTree {
    /// Construct a tree from an inode table and a root inode number.
    ///
    /// Every directory entry must point at an existing inode and the root
    /// must be a directory; violations surface here, not during walks.
    pub fn new(inodes: BTreeMap<u64, Inode>, root: u64) -> TreeResult<Self> {
        match inodes.get(&root) {
            Some(Inode::Directory(_)) => {}
            _ => return Err(TreeError::BadRoot(root)),
        }
        for (number, inode) in &inodes {
            if let Inode::Directory(dir) = inode {
                for (name, target) in &dir.entries {
                    if !inodes.contains_key(target) {
                        return Err(TreeError::DanglingEntry {
                            parent: *number,
                            name: name.clone(),
                            inode: *target,
                        });
                    }
                }
            }
        }
        Ok(Self { inodes, root })
    }

    /// An empty tree: a bare root directory.
    pub fn empty() -> Self {
        let mut inodes = BTreeMap::new();
        inodes.insert(
            ROOT_INODE,
            Inode::Directory(DirectoryInode::new(0o755, 0, 0)),
        );
        Self {
            inodes,
            root: ROOT_INODE,
        }
    }

    /// The root inode number.
    pub fn root(&self) -> u64 {
        self.root
    }

    /// Look up an inode by number.
    pub fn inode(&self, number: u64) -> Option<&Inode> {
        self.inodes.get(&number)
    }

    /// Number of inodes, including the root.
    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    /// Returns `true` if the tree holds only the root directory.
    pub fn is_empty(&self) -> bool {
        self.inodes.len() <= 1
    }

    /// Walk the tree in lexicographic path order.
    ///
    /// Yields every inode except the root, parents before children.
    /// Directory entries are stored sorted, so the order is deterministic
    /// across walks and across identical trees.
    pub fn walk(&self) -> Vec<WalkEntry<'_>> {
        let mut out = Vec::new();
        self.walk_dir(self.root, "", &mut out);
        out
    }

    fn walk_dir<'a>(&'a self, dir_number: u64, prefix: &str, out: &mut Vec<WalkEntry<'a>>) {
        let Some(Inode::Directory(dir)) = self.inodes.get(&dir_number) else {
            return;
        };
        for (name, number) in &dir.entries {
            let Some(inode) = self.inodes.get(number) else {
                continue;
            };
            let path = format!("{prefix}/{name}");
            out.push(WalkEntry {
                path: path.clone(),
                inode_number: *number,
                inode,
            });
            if inode.is_directory() {
                self.walk_dir(*number, &path, out);
            }
        }
    }

    /// Look up an inode by absolute path. `/` resolves to the root.
    pub fn lookup(&self, path: &str) -> Option<(u64, &Inode)> {
        let mut number = self.root;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            match self.inodes.get(&number)? {
                Inode::Directory(dir) => {
                    number = *dir.entries.get(component)?;
                }
                _ => return None,
            }
        }
        self.inodes.get(&number).map(|inode| (number, inode))
    }

    /// The set of content hashes referenced by regular inodes.
    ///
    /// This is the full set handed to the object store's batch
    /// re-referencing after a scan.
    pub fn referenced_hashes(&self) -> BTreeSet<ObjectHash> {
        self.inodes
            .values()
            .filter_map(|inode| inode.hash())
            .collect()
    }
}

/// Incremental construction helper for scanners and tests.
///
/// Parent directories are created on demand with default attributes
/// (mode 0o755, root-owned).
#[derive(Debug)]
pub struct TreeBuilder {
    inodes: BTreeMap<u64, Inode>,
    by_path: BTreeMap<String, u64>,
    next_number: u64,
}

impl TreeBuilder {
    pub fn new() -> Self {
        let mut inodes = BTreeMap::new();
        inodes.insert(
            ROOT_INODE,
            Inode::Directory(DirectoryInode::new(0o755, 0, 0)),
        );
        let mut by_path = BTreeMap::new();
        by_path.insert("/".to_string(), ROOT_INODE);
        Self {
            inodes,
            by_path,
            next_number: ROOT_INODE + 1,
        }
    }

    /// Add a directory at `path`.
    pub fn dir(self, path: &str) -> TreeResult<Self> {
        self.insert(path, Inode::Directory(DirectoryInode::new(0o755, 0, 0)))
    }

    /// Add a regular file with content `data`; hash and size are derived.
    pub fn file(self, path: &str, data: &[u8]) -> TreeResult<Self> {
        self.insert(
            path,
            Inode::Regular(RegularInode {
                mode: 0o644,
                uid: 0,
                gid: 0,
                mtime: 0,
                size: data.len() as u64,
                hash: ObjectHash::of_bytes(data),
            }),
        )
    }

    /// Add a regular file with an explicit inode.
    pub fn file_inode(self, path: &str, inode: RegularInode) -> TreeResult<Self> {
        self.insert(path, Inode::Regular(inode))
    }

    /// Add a computed-file placeholder with the given generator source.
    pub fn computed(self, path: &str, source: &str) -> TreeResult<Self> {
        self.insert(
            path,
            Inode::Computed(ComputedInode {
                mode: 0o644,
                uid: 0,
                gid: 0,
                source: source.to_string(),
            }),
        )
    }

    /// Add a symbolic link.
    pub fn symlink(self, path: &str, target: &str) -> TreeResult<Self> {
        self.insert(
            path,
            Inode::Symlink(SymlinkInode {
                uid: 0,
                gid: 0,
                target: target.to_string(),
            }),
        )
    }

    /// Add a device node.
    pub fn special(self, path: &str, mode: u32, rdev: u64) -> TreeResult<Self> {
        self.insert(
            path,
            Inode::Special(SpecialInode {
                mode,
                uid: 0,
                gid: 0,
                mtime: 0,
                rdev,
            }),
        )
    }

    /// Add an arbitrary inode at `path`.
    pub fn insert(mut self, path: &str, inode: Inode) -> TreeResult<Self> {
        if !path.starts_with('/') || path.ends_with('/') || path == "/" {
            return Err(TreeError::InvalidPath(path.to_string()));
        }
        if self.by_path.contains_key(path) {
            return Err(TreeError::DuplicatePath(path.to_string()));
        }
        let (parent_path, name) = match path.rfind('/') {
            Some(0) => ("/", &path[1..]),
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => return Err(TreeError::InvalidPath(path.to_string())),
        };
        let parent_number = self.ensure_dir(parent_path)?;
        let number = self.next_number;
        self.next_number += 1;
        self.inodes.insert(number, inode);
        self.by_path.insert(path.to_string(), number);
        match self.inodes.get_mut(&parent_number) {
            Some(Inode::Directory(dir)) => {
                dir.entries.insert(name.to_string(), number);
            }
            _ => return Err(TreeError::NotADirectory(parent_path.to_string())),
        }
        Ok(self)
    }

    fn ensure_dir(&mut self, path: &str) -> TreeResult<u64> {
        if let Some(number) = self.by_path.get(path) {
            return match self.inodes.get(number) {
                Some(Inode::Directory(_)) => Ok(*number),
                _ => Err(TreeError::NotADirectory(path.to_string())),
            };
        }
        let (parent_path, name) = match path.rfind('/') {
            Some(0) => ("/", &path[1..]),
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => return Err(TreeError::InvalidPath(path.to_string())),
        };
        let parent_number = self.ensure_dir(parent_path)?;
        let number = self.next_number;
        self.next_number += 1;
        self.inodes
            .insert(number, Inode::Directory(DirectoryInode::new(0o755, 0, 0)));
        self.by_path.insert(path.to_string(), number);
        if let Some(Inode::Directory(dir)) = self.inodes.get_mut(&parent_number) {
            dir.entries.insert(name.to_string(), number);
        }
        Ok(number)
    }

    /// Finalize the tree.
    pub fn build(self) -> TreeResult<FileSystemTree> {
        FileSystemTree::new(self.inodes, ROOT_INODE)
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
