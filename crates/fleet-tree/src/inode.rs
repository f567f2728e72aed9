use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fleet_types::ObjectHash;

/// A node in a [`crate::FileSystemTree`].
///
/// Identity of file *content* is the hash carried by a regular inode;
/// identity of file *position* is the path from the root. Two different
/// paths may reference the same hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inode {
    Directory(DirectoryInode),
    Regular(RegularInode),
    Computed(ComputedInode),
    Symlink(SymlinkInode),
    Special(SpecialInode),
}

impl Inode {
    /// The content hash, for inodes that carry one.
    pub fn hash(&self) -> Option<ObjectHash> {
        match self {
            Self::Regular(inode) => Some(inode.hash),
            _ => None,
        }
    }

    /// Returns `true` for directory inodes.
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Short kind name for log lines and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Directory(_) => "directory",
            Self::Regular(_) => "regular",
            Self::Computed(_) => "computed",
            Self::Symlink(_) => "symlink",
            Self::Special(_) => "special",
        }
    }
}

/// A directory: entries map names to inode numbers, deterministically
/// ordered so tree walks are stable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryInode {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub entries: BTreeMap<String, u64>,
}

impl DirectoryInode {
    /// An empty directory with the given permissions.
    pub fn new(mode: u32, uid: u32, gid: u32) -> Self {
        Self {
            mode,
            uid,
            gid,
            entries: BTreeMap::new(),
        }
    }
}

/// A regular file with fixed content, identified by hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularInode {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Modification time, seconds since the epoch.
    pub mtime: i64,
    /// Content length in bytes.
    pub size: u64,
    /// Content hash.
    pub hash: ObjectHash,
}

impl RegularInode {
    /// Returns `true` when only metadata differs from `other` (same
    /// content, different attributes).
    pub fn same_content(&self, other: &RegularInode) -> bool {
        self.hash == other.hash && self.size == other.size
    }
}

/// A file whose content is generated on demand by the owning machine.
///
/// Carries generation parameters but no stable pre-scan hash; the hash is
/// only known after local generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedInode {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Names the generator that produces this file's content.
    pub source: String,
}

/// A symbolic link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymlinkInode {
    pub uid: u32,
    pub gid: u32,
    pub target: String,
}

/// A device node, fifo or socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialInode {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub mtime: i64,
    pub rdev: u64,
}
