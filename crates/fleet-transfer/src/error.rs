use thiserror::Error;

use fleet_store::StoreError;
use fleet_types::ObjectHash;

/// Errors from object transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// A hash promised by the reconciliation step could not be produced
    /// by the getter. The generation step and the push step disagree; a
    /// consistency bug that must never be silently skipped.
    #[error("failed to get promised object {hash}: {source}")]
    ObjectRead {
        hash: ObjectHash,
        source: StoreError,
    },

    /// The getter produced bytes that do not match the promised hash.
    #[error("hash mismatch for pushed object: expected {expected}, computed {computed}")]
    HashMismatch {
        expected: ObjectHash,
        computed: ObjectHash,
    },

    /// The pass was cancelled between per-object steps.
    #[error("transfer cancelled after {completed} objects")]
    Cancelled { completed: u64 },

    /// The remote sink rejected or failed a write.
    #[error("remote sink error: {0}")]
    Sink(String),
}

/// Result alias for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;
