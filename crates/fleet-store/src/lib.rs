//! Content-addressed object storage for the fleetimage distribution system.
//!
//! The [`ObjectStore`] deduplicates file content across a whole fleet:
//! every blob is identified by its [`fleet_types::ObjectHash`], stored
//! once, and reference-counted. Whole-tree rescans drive referencing as a
//! batch recomputation ([`ObjectStore::mark_referenced`]) rather than a
//! stream of per-inode increments, so the bookkeeping cannot drift from
//! actual tree contents.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Durability before visibility: blob I/O commits before the index
//!    records the object, and never runs under the index lock.
//! 3. The accounting invariants (`referenced + unreferenced == total`,
//!    for both counts and bytes) hold at every snapshot; a violation is a
//!    bug, and the store halts rather than repair itself.
//! 4. Unreferenced objects survive a configurable grace period before
//!    garbage collection, protecting objects about to be re-referenced by
//!    an in-flight update.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod backend;
pub mod disk;
pub mod error;
pub mod lockwatch;
pub mod store;
pub mod traits;

pub use backend::{BlobBackend, MemoryBackend, SpaceMetrics};
pub use disk::DiskBackend;
pub use error::{StoreError, StoreResult};
pub use lockwatch::{LockWatcher, LockWatcherOptions, LockWatcherStats};
pub use store::{ObjectStore, StoreConfig, StoreSnapshot};
pub use traits::ObjectGetter;
