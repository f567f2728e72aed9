use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use fleet_types::ObjectHash;

use crate::backend::{BlobBackend, SpaceMetrics};
use crate::error::{StoreError, StoreResult};

/// Filesystem blob storage: one file per object, fanned out by the first
/// hex byte of the hash (`<root>/ab/cdef...`).
///
/// Writes go to a temporary file in the same directory and are renamed
/// into place, so a blob is either fully present or absent; there is no
/// partially-written visible state.
pub struct DiskBackend {
    root: PathBuf,
    capacity_bytes: u64,
}

impl DiskBackend {
    /// Open (or create) a blob directory at `root`.
    pub fn open(root: &Path, capacity_bytes: u64) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            capacity_bytes,
        })
    }

    fn blob_path(&self, hash: &ObjectHash) -> PathBuf {
        let hex = hash.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    fn used_bytes(dir: &Path) -> io::Result<u64> {
        let mut total = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                total += Self::used_bytes(&entry.path())?;
            } else {
                total += metadata.len();
            }
        }
        Ok(total)
    }
}

impl BlobBackend for DiskBackend {
    fn write_blob(&self, hash: &ObjectHash, data: &[u8]) -> StoreResult<()> {
        let path = self.blob_path(hash);
        let parent = path.parent().expect("blob path always has a parent");
        fs::create_dir_all(parent)?;

        // Temp file in the target directory so the rename cannot cross
        // filesystems.
        let tmp = parent.join(format!(".tmp.{}", hash.short_hex()));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(hash = %hash.short_hex(), bytes = data.len(), "blob written");
        Ok(())
    }

    fn read_blob(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>> {
        match fs::read(self.blob_path(hash)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(*hash)),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_blob(&self, hash: &ObjectHash) -> StoreResult<()> {
        match fs::remove_file(self.blob_path(hash)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn space_metrics(&self) -> StoreResult<SpaceMetrics> {
        let used = Self::used_bytes(&self.root)?;
        Ok(SpaceMetrics {
            free_bytes: self.capacity_bytes.saturating_sub(used),
            capacity_bytes: self.capacity_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_backend(dir: &tempfile::TempDir) -> DiskBackend {
        DiskBackend::open(dir.path(), 1 << 20).unwrap()
    }

    #[test]
    fn write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir);
        let hash = ObjectHash::of_bytes(b"disk blob");
        backend.write_blob(&hash, b"disk blob").unwrap();
        assert_eq!(backend.read_blob(&hash).unwrap(), b"disk blob");
    }

    #[test]
    fn blobs_fan_out_by_hash_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir);
        let hash = ObjectHash::of_bytes(b"fanout");
        backend.write_blob(&hash, b"fanout").unwrap();

        let hex = hash.to_hex();
        let expected = dir.path().join(&hex[..2]).join(&hex[2..]);
        assert!(expected.exists());
    }

    #[test]
    fn read_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir);
        assert!(matches!(
            backend.read_blob(&ObjectHash::of_bytes(b"missing")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir);
        let hash = ObjectHash::of_bytes(b"gone");
        backend.write_blob(&hash, b"gone").unwrap();
        backend.delete_blob(&hash).unwrap();
        backend.delete_blob(&hash).unwrap();
        assert!(matches!(
            backend.read_blob(&hash),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn no_temp_files_remain_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir);
        let hash = ObjectHash::of_bytes(b"clean");
        backend.write_blob(&hash, b"clean").unwrap();

        let mut stack = vec![dir.path().to_path_buf()];
        while let Some(d) = stack.pop() {
            for entry in fs::read_dir(&d).unwrap() {
                let entry = entry.unwrap();
                if entry.metadata().unwrap().is_dir() {
                    stack.push(entry.path());
                } else {
                    let name = entry.file_name();
                    assert!(!name.to_string_lossy().starts_with(".tmp."));
                }
            }
        }
    }

    #[test]
    fn space_metrics_reflect_written_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_backend(&dir);
        backend
            .write_blob(&ObjectHash::of_bytes(b"12345"), b"12345")
            .unwrap();
        let metrics = backend.space_metrics().unwrap();
        assert_eq!(metrics.capacity_bytes - metrics.free_bytes, 5);
    }
}
