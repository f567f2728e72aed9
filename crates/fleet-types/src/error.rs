use thiserror::Error;

/// Errors from foundation type parsing and construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A decoded value had the wrong length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// An unknown digest algorithm tag was encountered.
    #[error("unknown digest algorithm tag: {0}")]
    UnknownAlgorithm(u8),
}
