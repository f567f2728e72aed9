use fleet_types::ObjectHash;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object is not in the store.
    #[error("object not found: {0}")]
    NotFound(ObjectHash),

    /// Content digest disagreement: corruption in transit or at rest.
    ///
    /// Always fatal to the operation, never silently accepted.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch {
        expected: ObjectHash,
        computed: ObjectHash,
    },

    /// I/O failure in the underlying blob backend. The index is left
    /// unchanged; the operation may be retried.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An accounting invariant does not hold. Internal consistency bug;
    /// the store stops accepting mutations.
    #[error("accounting invariant violated: {0}")]
    AccountingViolation(String),

    /// The store halted after an accounting violation and requires
    /// operator intervention (reconstruct and re-scan).
    #[error("store is halted after an accounting violation")]
    Halted,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
