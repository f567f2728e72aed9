use std::collections::HashMap;
use std::sync::RwLock;

use fleet_types::ObjectHash;

use crate::error::{StoreError, StoreResult};

/// Free and total capacity of the volume backing a blob store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpaceMetrics {
    pub free_bytes: u64,
    pub capacity_bytes: u64,
}

/// Durable blob I/O keyed by content hash.
///
/// The [`crate::ObjectStore`] calls these methods outside its index lock;
/// a write must be fully committed when `write_blob` returns, since the
/// index records the object immediately afterwards.
pub trait BlobBackend: Send + Sync {
    /// Persist `data` under `hash`. Overwriting an existing blob with the
    /// same hash is harmless (the content is identical by construction).
    fn write_blob(&self, hash: &ObjectHash, data: &[u8]) -> StoreResult<()>;

    /// Read the blob stored under `hash`.
    fn read_blob(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>>;

    /// Remove the blob stored under `hash`. Removing an absent blob is
    /// not an error (a crashed earlier collection may have got there
    /// first).
    fn delete_blob(&self, hash: &ObjectHash) -> StoreResult<()>;

    /// Free space and capacity of the backing volume.
    fn space_metrics(&self) -> StoreResult<SpaceMetrics>;
}

/// HashMap-backed blob storage for tests and embedding.
///
/// Capacity is declared at construction; free space is capacity minus
/// bytes currently held.
pub struct MemoryBackend {
    blobs: RwLock<HashMap<ObjectHash, Vec<u8>>>,
    capacity_bytes: u64,
}

impl MemoryBackend {
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            capacity_bytes,
        }
    }

    fn used_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        // Roomy enough that tests never hit the capacity ceiling.
        Self::new(1 << 30)
    }
}

impl BlobBackend for MemoryBackend {
    fn write_blob(&self, hash: &ObjectHash, data: &[u8]) -> StoreResult<()> {
        let mut blobs = self.blobs.write().expect("lock poisoned");
        blobs.insert(*hash, data.to_vec());
        Ok(())
    }

    fn read_blob(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>> {
        let blobs = self.blobs.read().expect("lock poisoned");
        blobs
            .get(hash)
            .cloned()
            .ok_or(StoreError::NotFound(*hash))
    }

    fn delete_blob(&self, hash: &ObjectHash) -> StoreResult<()> {
        self.blobs.write().expect("lock poisoned").remove(hash);
        Ok(())
    }

    fn space_metrics(&self) -> StoreResult<SpaceMetrics> {
        let used = self.used_bytes();
        Ok(SpaceMetrics {
            free_bytes: self.capacity_bytes.saturating_sub(used),
            capacity_bytes: self.capacity_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_delete_roundtrip() {
        let backend = MemoryBackend::default();
        let hash = ObjectHash::of_bytes(b"blob");
        backend.write_blob(&hash, b"blob").unwrap();
        assert_eq!(backend.read_blob(&hash).unwrap(), b"blob");
        backend.delete_blob(&hash).unwrap();
        assert!(matches!(
            backend.read_blob(&hash),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn delete_absent_blob_is_ok() {
        let backend = MemoryBackend::default();
        backend.delete_blob(&ObjectHash::of_bytes(b"never")).unwrap();
    }

    #[test]
    fn space_metrics_track_usage() {
        let backend = MemoryBackend::new(100);
        let before = backend.space_metrics().unwrap();
        assert_eq!(before.free_bytes, 100);

        backend
            .write_blob(&ObjectHash::of_bytes(b"12345"), b"12345")
            .unwrap();
        let after = backend.space_metrics().unwrap();
        assert_eq!(after.free_bytes, 95);
        assert_eq!(after.capacity_bytes, 100);
    }
}
