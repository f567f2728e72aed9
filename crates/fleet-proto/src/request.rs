use serde::{Deserialize, Serialize};

use fleet_types::ObjectHash;

/// Version of the update request payload, bumped on incompatible change.
pub const PROTOCOL_VERSION: u32 = 1;

/// A directory to create on the receiving machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryToMake {
    pub path: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

/// A non-directory inode to materialize, self-contained so the receiving
/// agent needs no tree context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewInode {
    /// Regular file; content arrives separately, keyed by hash.
    Regular {
        mode: u32,
        uid: u32,
        gid: u32,
        mtime: i64,
        size: u64,
        hash: ObjectHash,
    },
    Symlink {
        uid: u32,
        gid: u32,
        target: String,
    },
    Special {
        mode: u32,
        uid: u32,
        gid: u32,
        mtime: i64,
        rdev: u64,
    },
}

/// An inode to create or overwrite at a path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InodeToMake {
    pub path: String,
    pub inode: NewInode,
}

/// A metadata-only change to an existing inode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InodeToChange {
    pub path: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: i64,
}

/// The structural edit script for one machine's update.
///
/// Operations are ordered so a receiving agent can apply them in place:
/// directories are created before the inodes beneath them (the engine
/// emits them in lexicographic path order), deletions are independent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub paths_to_delete: Vec<String>,
    pub directories_to_make: Vec<DirectoryToMake>,
    pub inodes_to_make: Vec<InodeToMake>,
    pub inodes_to_change: Vec<InodeToChange>,
}

impl UpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of operations in the request.
    pub fn len(&self) -> usize {
        self.paths_to_delete.len()
            + self.directories_to_make.len()
            + self.inodes_to_make.len()
            + self.inodes_to_change.len()
    }

    /// Returns `true` when the request carries no operations (the
    /// machine already matches its image).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
