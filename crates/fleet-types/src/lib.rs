//! Foundation types for the fleetimage distribution system.
//!
//! This crate provides the content-identity and control types used
//! throughout fleetimage. Every other fleet crate depends on `fleet-types`.
//!
//! # Key Types
//!
//! - [`ObjectHash`] — Content-addressed identifier (versioned BLAKE3 digest)
//! - [`DigestAlgorithm`] — Digest scheme tag carried inside every hash
//! - [`CancelFlag`] — Cooperative cancellation signal for long passes

pub mod cancel;
pub mod error;
pub mod hash;

pub use cancel::CancelFlag;
pub use error::TypeError;
pub use hash::{DigestAlgorithm, ObjectHash};
