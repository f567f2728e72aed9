use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Domain separation prefix for content hashing.
///
/// Prepended to every digest computation so that fleetimage object hashes
/// can never collide with hashes of the same bytes computed by another
/// system sharing the object namespace.
const HASH_DOMAIN: &[u8] = b"fleetimage-object-v1:";

/// The digest scheme used to compute an [`ObjectHash`].
///
/// Carried inside every hash value so the scheme can be rotated without
/// reinterpreting identities minted under an older one. Two hashes with
/// different algorithms never compare equal, even for identical content.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// BLAKE3, 256-bit output, domain-separated.
    Blake3,
}

impl DigestAlgorithm {
    /// Stable single-byte tag (for compact encodings).
    pub fn tag(&self) -> u8 {
        match self {
            Self::Blake3 => 1,
        }
    }

    /// Parse from a stable tag byte.
    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        match tag {
            1 => Ok(Self::Blake3),
            other => Err(TypeError::UnknownAlgorithm(other)),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Content-addressed identifier for a stored object.
///
/// An `ObjectHash` is the digest of an object's bytes under the scheme
/// named by its `algorithm` field. Identical content always produces the
/// same hash, making objects deduplicatable and verifiable. Equal hashes
/// are assumed to identify byte-identical content; a collision is an
/// unrecoverable invariant violation, not a normal error path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHash {
    algorithm: DigestAlgorithm,
    digest: [u8; 32],
}

impl ObjectHash {
    /// Compute the hash of raw content bytes under the current scheme.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HASH_DOMAIN);
        hasher.update(data);
        Self {
            algorithm: DigestAlgorithm::Blake3,
            digest: *hasher.finalize().as_bytes(),
        }
    }

    /// Build a hash from a pre-computed digest.
    pub fn from_digest(algorithm: DigestAlgorithm, digest: [u8; 32]) -> Self {
        Self { algorithm, digest }
    }

    /// The null hash (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self {
            algorithm: DigestAlgorithm::Blake3,
            digest: [0u8; 32],
        }
    }

    /// Returns `true` if this is the null hash.
    pub fn is_null(&self) -> bool {
        self.digest == [0u8; 32]
    }

    /// Recompute the digest of `data` and compare against this hash.
    pub fn verify(&self, data: &[u8]) -> bool {
        match self.algorithm {
            DigestAlgorithm::Blake3 => Self::of_bytes(data) == *self,
        }
    }

    /// The digest scheme this hash was computed under.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Hex-encoded digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Short hex form (first 8 characters), for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..4])
    }

    /// Parse a hash from a hex digest string (current scheme assumed).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(Self {
            algorithm: DigestAlgorithm::Blake3,
            digest,
        })
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({}:{})", self.algorithm, self.short_hex())
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
