//! Object transfer for the fleetimage distribution system.
//!
//! Realizes a push list produced by the reconciliation engine: reads the
//! bytes for each hash from an [`fleet_store::ObjectGetter`] and writes
//! them to a remote [`ObjectSink`]. Every object is verified against its
//! hash before it leaves the machine, and the pass is abortable between
//! objects via [`fleet_types::CancelFlag`].
//!
//! Pushes are idempotent by hash, so a partially-applied push is safe to
//! abandon and retry.

pub mod error;
pub mod push;
pub mod sink;

pub use error::{TransferError, TransferResult};
pub use push::{push_objects, PushStats};
pub use sink::{MemorySink, ObjectSink};
