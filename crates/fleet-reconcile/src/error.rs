use thiserror::Error;

/// Errors from reconciliation passes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// A path carries both a fixed-hash inode and a computed-file spec.
    /// Configuration conflict; the pass fails rather than guess which
    /// wins.
    #[error("ambiguous inode spec for {path}: both fixed-hash and computed")]
    AmbiguousInodeSpec { path: String },

    /// A desired computed file could not be resolved for this machine.
    /// Recoverable per the caller's policy flags; otherwise the whole
    /// pass fails so an incomplete delta is never applied.
    #[error("missing computed file: {path}")]
    MissingComputedFile { path: String },
}

impl ReconcileError {
    /// Returns `true` when the pass failed because of a missing computed
    /// file (the recoverable-by-policy case).
    pub fn is_missing_computed_file(&self) -> bool {
        matches!(self, Self::MissingComputedFile { .. })
    }
}

/// Result alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
