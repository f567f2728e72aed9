//! Filesystem tree snapshots for the fleetimage distribution system.
//!
//! A [`FileSystemTree`] is an immutable, hash-annotated snapshot of a
//! directory tree: inodes keyed by numeric id, directory entries keyed by
//! name. Trees are produced by an external scanner, consumed by the
//! reconciliation engine, and never mutated in place -- a rescan produces
//! a new tree.
//!
//! The crate also provides the [`Filter`] (glob-based path exclusion), the
//! [`ObjectCache`] (hashes a machine physically holds) and the [`Image`]
//! (desired state: tree + filter + computed-file specs).

pub mod cache;
pub mod error;
pub mod filter;
pub mod image;
pub mod inode;
pub mod tree;

pub use cache::ObjectCache;
pub use error::{TreeError, TreeResult};
pub use filter::Filter;
pub use image::Image;
pub use inode::{
    ComputedInode, DirectoryInode, Inode, RegularInode, SpecialInode, SymlinkInode,
};
pub use tree::{FileSystemTree, TreeBuilder, WalkEntry};
