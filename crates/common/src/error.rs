use std::io;

use thiserror::Error;

/// Convenience alias used across the storage crates.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The externally observable error taxonomy.
///
/// Success carries its payload structurally (`Ok(..)`), and "no live value
/// for this key" is likewise structural: `Ok(None)` from the engine,
/// `Option` from the memtable, `RunLookup::Miss` from a run reader. Only
/// genuine failures live here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The arena could not satisfy an allocation (OS allocation failure).
    #[error("arena allocation failed: {0}")]
    ArenaAlloc(String),

    /// On-disk data that cannot be decoded: truncated headers, boundary
    /// overruns, unknown value tags, decompression mismatches.
    #[error("corruption: {0}")]
    Corruption(String),

    /// A well-formed request this build cannot serve, e.g. an unknown
    /// compression flag in a block header.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A caller-supplied problem: empty key, oversized key or value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An underlying filesystem error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Catch-all for failures outside the categories above.
    #[error("{0}")]
    Other(String),
}
