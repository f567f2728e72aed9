//! Update request structures for the fleetimage update protocol.
//!
//! The reconciliation engine fills an [`UpdateRequest`] with the
//! structural edit script that transforms a machine's live tree into the
//! filtered desired tree. Serialization and delivery belong to the
//! transport layer; this crate only defines the payload.

pub mod request;

pub use request::{
    DirectoryToMake, InodeToChange, InodeToMake, NewInode, UpdateRequest, PROTOCOL_VERSION,
};
