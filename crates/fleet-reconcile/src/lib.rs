//! Reconciliation engine for the fleetimage distribution system.
//!
//! Compares one machine's live [`fleet_tree::FileSystemTree`] and
//! [`fleet_tree::ObjectCache`] against a desired [`fleet_tree::Image`]
//! and produces the minimal object-level delta:
//!
//! - [`build_missing_lists`] — the objects to fetch from a remote object
//!   server and the computed objects the machine must generate and push.
//! - [`build_update_request`] — the structural edit script (inode
//!   additions, removals, attribute changes) for the update protocol.
//!
//! Both walks treat their inputs as immutable snapshots; a concurrent
//! rescan produces a new tree rather than mutating one a walk is using.

mod desired;
pub mod error;
pub mod missing;
pub mod sub;
pub mod update;

pub use error::{ReconcileError, ReconcileResult};
pub use missing::{build_missing_lists, MissingLists};
pub use sub::Sub;
pub use update::build_update_request;
