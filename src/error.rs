//! Error taxonomy for recoverable map failures.
//!
//! Precondition violations (erasing the end position, splicing a foreign
//! node) are logic bugs in the caller and panic instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum MapError {
    /// Strict lookup found no record for the key.
    #[error("key not present in map")]
    MissingKey,
    #[error("max load factor must be finite and at least f32::EPSILON, got {0}")]
    InvalidLoadFactor(f32),
    #[error("bucket count must be at least 1")]
    ZeroBuckets,
}
