use thiserror::Error;

/// Errors from tree construction and filtering.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A directory entry points at an inode number that does not exist.
    #[error("dangling entry {name:?} in directory inode {parent}: no inode {inode}")]
    DanglingEntry { parent: u64, name: String, inode: u64 },

    /// The root inode is missing or is not a directory.
    #[error("root inode {0} is missing or not a directory")]
    BadRoot(u64),

    /// A path was added twice to a tree builder.
    #[error("duplicate path: {0}")]
    DuplicatePath(String),

    /// A path does not start with '/' or is otherwise malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A parent component of a path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A filter pattern failed to compile.
    #[error("invalid filter pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
