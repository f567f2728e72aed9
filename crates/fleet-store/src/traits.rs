use fleet_types::ObjectHash;

use crate::error::StoreResult;

/// Read-only content source keyed by hash.
///
/// Implemented by the [`crate::ObjectStore`] itself and by the computed
/// file generation layer; consumed by the transfer step when realizing a
/// push list.
pub trait ObjectGetter: Send + Sync {
    /// Fetch the bytes for `hash`.
    ///
    /// Returns [`crate::StoreError::NotFound`] when the hash is unknown.
    /// Implementations must verify the content against the hash before
    /// returning it.
    fn get(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>>;
}
