use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use fleet_types::ObjectHash;

use crate::backend::{BlobBackend, MemoryBackend, SpaceMetrics};
use crate::error::{StoreError, StoreResult};
use crate::lockwatch::{LockWatcher, LockWatcherOptions};
use crate::traits::ObjectGetter;

/// Explicit store configuration, constructed once at process start and
/// passed by reference into the components that need it.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// How long an object must stay unreferenced before garbage
    /// collection may delete it. Protects objects that are about to be
    /// re-referenced by an in-flight update.
    pub gc_grace: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            gc_grace: Duration::from_secs(15 * 60),
        }
    }
}

/// Read-only accounting snapshot.
///
/// Satisfies `num_referenced + num_unreferenced == num_objects` and
/// `referenced_bytes + unreferenced_bytes == total_bytes` at the instant
/// it was taken; [`ObjectStore::snapshot`] verifies this before
/// returning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub num_objects: u64,
    pub num_referenced: u64,
    pub num_unreferenced: u64,
    /// References beyond the first, across all objects.
    pub num_duplicated: u64,
    pub total_bytes: u64,
    pub referenced_bytes: u64,
    pub unreferenced_bytes: u64,
    /// Bytes that dedup avoided storing again.
    pub duplicated_bytes: u64,
}

struct ObjectRecord {
    size: u64,
    ref_count: u64,
    /// Set while the object is unreferenced; drives the GC grace period.
    unreferenced_since: Option<Instant>,
}

#[derive(Default)]
struct Index {
    objects: HashMap<ObjectHash, ObjectRecord>,
    num_referenced: u64,
    num_unreferenced: u64,
    num_duplicated: u64,
    total_bytes: u64,
    referenced_bytes: u64,
    unreferenced_bytes: u64,
    duplicated_bytes: u64,
    /// Set after an accounting violation; all further mutations fail.
    halted: bool,
}

impl Index {
    fn check_halted(&self) -> StoreResult<()> {
        if self.halted {
            Err(StoreError::Halted)
        } else {
            Ok(())
        }
    }

    fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            num_objects: self.objects.len() as u64,
            num_referenced: self.num_referenced,
            num_unreferenced: self.num_unreferenced,
            num_duplicated: self.num_duplicated,
            total_bytes: self.total_bytes,
            referenced_bytes: self.referenced_bytes,
            unreferenced_bytes: self.unreferenced_bytes,
            duplicated_bytes: self.duplicated_bytes,
        }
    }
}

/// Content-addressed, reference-counted, deduplicating blob store.
///
/// The index is protected by a single reader/writer lock: reads
/// ([`Self::snapshot`], [`Self::space_metrics`], lookups) share it,
/// mutations ([`Self::add`], [`Self::mark_referenced`],
/// [`Self::garbage_collect`]) are exclusive. Blob I/O never runs while
/// the lock is held.
pub struct ObjectStore<B: BlobBackend = MemoryBackend> {
    index: Arc<RwLock<Index>>,
    backend: B,
    config: StoreConfig,
}

impl<B: BlobBackend> ObjectStore<B> {
    pub fn new(backend: B, config: StoreConfig) -> Self {
        Self {
            index: Arc::new(RwLock::new(Index::default())),
            backend,
            config,
        }
    }

    /// Add an object, deduplicating by content.
    ///
    /// If `expected_hash` is supplied and disagrees with the computed
    /// hash of `data`, the add fails with
    /// [`StoreError::HashMismatch`] (corruption in transit) and the
    /// store is unchanged. If the object already exists its reference
    /// count is bumped without rewriting any bytes; otherwise the blob
    /// is committed through the backend first and the index records the
    /// object only after the write succeeds.
    pub fn add(&self, data: &[u8], expected_hash: Option<ObjectHash>) -> StoreResult<ObjectHash> {
        let computed = ObjectHash::of_bytes(data);
        if let Some(expected) = expected_hash {
            if expected != computed {
                return Err(StoreError::HashMismatch { expected, computed });
            }
        }

        {
            let mut index = self.index.write().expect("lock poisoned");
            index.check_halted()?;
            if index.objects.contains_key(&computed) {
                Self::bump_existing(&mut index, &computed);
                debug!(hash = %computed.short_hex(), "object deduplicated");
                return Ok(computed);
            }
        }

        // New object: commit the blob before it becomes visible in the
        // index. A failure here leaves no partial record.
        self.backend.write_blob(&computed, data)?;

        let mut index = self.index.write().expect("lock poisoned");
        index.check_halted()?;
        if index.objects.contains_key(&computed) {
            // Lost a race with a concurrent add of the same content; the
            // duplicate blob write was byte-identical and harmless.
            Self::bump_existing(&mut index, &computed);
            return Ok(computed);
        }
        let size = data.len() as u64;
        index.objects.insert(
            computed,
            ObjectRecord {
                size,
                ref_count: 1,
                unreferenced_since: None,
            },
        );
        index.num_referenced += 1;
        index.total_bytes += size;
        index.referenced_bytes += size;
        debug!(hash = %computed.short_hex(), bytes = size, "object added");
        Ok(computed)
    }

    fn bump_existing(index: &mut Index, hash: &ObjectHash) {
        let (size, revived) = {
            let record = index.objects.get_mut(hash).expect("caller checked presence");
            record.ref_count += 1;
            (record.size, record.unreferenced_since.take().is_some())
        };
        if revived {
            // Revived an unreferenced object before GC reached it; this
            // is its first live reference again, not a duplicate.
            index.num_unreferenced -= 1;
            index.unreferenced_bytes -= size;
            index.num_referenced += 1;
            index.referenced_bytes += size;
        } else {
            index.num_duplicated += 1;
            index.duplicated_bytes += size;
        }
    }

    /// Recompute referencing from the full set of hashes a newly-scanned
    /// tree uses.
    ///
    /// Objects outside the set become unreferenced (their grace clock
    /// starts); objects inside it become referenced. This is a batch
    /// recomputation against a complete snapshot, not a stream of
    /// per-inode increments, so the counters cannot drift from actual
    /// tree contents.
    pub fn mark_referenced(&self, referenced: &BTreeSet<ObjectHash>) -> StoreResult<()> {
        let now = Instant::now();
        let mut index = self.index.write().expect("lock poisoned");
        index.check_halted()?;

        let mut num_referenced = 0u64;
        let mut num_unreferenced = 0u64;
        let mut num_duplicated = 0u64;
        let mut referenced_bytes = 0u64;
        let mut unreferenced_bytes = 0u64;
        let mut duplicated_bytes = 0u64;
        for (hash, record) in index.objects.iter_mut() {
            if referenced.contains(hash) {
                if record.ref_count == 0 {
                    record.unreferenced_since = None;
                }
                // The tree references each hash exactly once, however
                // many paths share it.
                record.ref_count = 1;
                num_referenced += 1;
                referenced_bytes += record.size;
            } else {
                if record.ref_count > 0 {
                    record.ref_count = 0;
                    record.unreferenced_since = Some(now);
                }
                num_unreferenced += 1;
                unreferenced_bytes += record.size;
            }
            num_duplicated += record.ref_count.saturating_sub(1);
            duplicated_bytes += record.ref_count.saturating_sub(1) * record.size;
        }
        index.num_referenced = num_referenced;
        index.num_unreferenced = num_unreferenced;
        index.num_duplicated = num_duplicated;
        index.referenced_bytes = referenced_bytes;
        index.unreferenced_bytes = unreferenced_bytes;
        index.duplicated_bytes = duplicated_bytes;
        info!(
            referenced = num_referenced,
            unreferenced = num_unreferenced,
            "referencing recomputed"
        );
        Ok(())
    }

    /// Delete unreferenced objects whose grace period has elapsed.
    ///
    /// Returns the number of bytes freed. Never deletes a referenced
    /// object. Blob deletion happens after the records are dropped from
    /// the index, outside the lock; a failed deletion does not stop the
    /// pass, every victim is attempted and the first error is reported
    /// at the end.
    pub fn garbage_collect(&self) -> StoreResult<u64> {
        let victims: Vec<(ObjectHash, u64)> = {
            let mut index = self.index.write().expect("lock poisoned");
            index.check_halted()?;
            let grace = self.config.gc_grace;
            let expired: Vec<ObjectHash> = index
                .objects
                .iter()
                .filter(|(_, record)| {
                    record.ref_count == 0
                        && record
                            .unreferenced_since
                            .is_some_and(|since| since.elapsed() >= grace)
                })
                .map(|(hash, _)| *hash)
                .collect();
            let mut victims = Vec::with_capacity(expired.len());
            for hash in expired {
                let record = index.objects.remove(&hash).expect("collected above");
                index.num_unreferenced -= 1;
                index.unreferenced_bytes -= record.size;
                index.total_bytes -= record.size;
                victims.push((hash, record.size));
            }
            victims
        };

        let mut freed = 0u64;
        let mut first_error = None;
        for (hash, size) in &victims {
            match self.backend.delete_blob(hash) {
                Ok(()) => freed += size,
                Err(e) => {
                    warn!(hash = %hash.short_hex(), error = %e, "blob deletion failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if !victims.is_empty() {
            info!(objects = victims.len(), bytes = freed, "garbage collected");
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(freed),
        }
    }

    /// Free space and capacity of the backing volume. Shared lock only.
    pub fn space_metrics(&self) -> StoreResult<SpaceMetrics> {
        self.backend.space_metrics()
    }

    /// Take an accounting snapshot and verify its invariants.
    ///
    /// A violation is an internal bug, not an operating condition: it is
    /// logged as fatal and the store halts rather than proceed on
    /// corrupted bookkeeping.
    pub fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let (snapshot, violation) = {
            let index = self.index.read().expect("lock poisoned");
            let snapshot = index.to_snapshot();
            let violation = Self::invariant_violation(&snapshot);
            (snapshot, violation)
        };
        if let Some(detail) = violation {
            error!(%detail, "accounting invariant violated; halting store");
            self.index.write().expect("lock poisoned").halted = true;
            return Err(StoreError::AccountingViolation(detail));
        }
        Ok(snapshot)
    }

    fn invariant_violation(s: &StoreSnapshot) -> Option<String> {
        if s.num_referenced + s.num_unreferenced != s.num_objects {
            return Some(format!(
                "object accounting: referenced {} + unreferenced {} != total {}",
                s.num_referenced, s.num_unreferenced, s.num_objects
            ));
        }
        if s.referenced_bytes + s.unreferenced_bytes != s.total_bytes {
            return Some(format!(
                "byte accounting: referenced {} + unreferenced {} != total {}",
                s.referenced_bytes, s.unreferenced_bytes, s.total_bytes
            ));
        }
        None
    }

    /// Returns `true` when `hash` is recorded in the index.
    pub fn contains(&self, hash: &ObjectHash) -> bool {
        self.index
            .read()
            .expect("lock poisoned")
            .objects
            .contains_key(hash)
    }

    /// Size of the stored object, if present.
    pub fn object_size(&self, hash: &ObjectHash) -> Option<u64> {
        self.index
            .read()
            .expect("lock poisoned")
            .objects
            .get(hash)
            .map(|record| record.size)
    }

    /// Current reference count of the stored object, if present.
    pub fn ref_count(&self, hash: &ObjectHash) -> Option<u64> {
        self.index
            .read()
            .expect("lock poisoned")
            .objects
            .get(hash)
            .map(|record| record.ref_count)
    }

    /// Spawn the optional lock-liveness diagnostic for this store's
    /// index lock. The store works identically without it.
    pub fn watch_locks(&self, options: LockWatcherOptions) -> LockWatcher {
        LockWatcher::spawn(Arc::clone(&self.index), options)
    }

    #[cfg(test)]
    pub(crate) fn break_accounting_for_test(&self) {
        self.index.write().expect("lock poisoned").num_referenced += 1;
    }
}

impl<B: BlobBackend> ObjectGetter for ObjectStore<B> {
    fn get(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>> {
        if !self.contains(hash) {
            return Err(StoreError::NotFound(*hash));
        }
        let data = self.backend.read_blob(hash)?;
        if !hash.verify(&data) {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                computed: ObjectHash::of_bytes(&data),
            });
        }
        Ok(data)
    }
}
