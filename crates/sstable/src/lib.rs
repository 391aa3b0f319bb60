//! # SSTable - Sorted Runs
//!
//! Immutable, on-disk storage files for the LoamKV engine.
//!
//! When the in-memory [`memtable::Memtable`] crosses its size threshold the
//! engine serializes it to a *sorted run*: an append-only file of
//! self-describing blocks, written once and never modified. Runs carry no
//! file-level header, footer, or index; a reader discovers blocks by
//! walking the file front to back.
//!
//! ## File layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ BLOCK (repeated to end of file)                             │
//! │                                                             │
//! │ uncompressed_size (u32 LE)                                  │
//! │ on_disk_size      (u32 LE)                                  │
//! │ compression_flag  (u8)      0 = raw, 1 = zstd               │
//! │ payload           (on_disk_size bytes)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The payload, once decompressed, is a concatenation of entries in strictly
//! ascending key order (ascending across block boundaries too, since the writer
//! streams a sorted cursor in a single pass):
//!
//! ```text
//! key_len (u32 LE) | key | tag (u8) | value_len (u32 LE) | value
//! ```
//!
//! `tag` is the [`common::ValueKind`] alphabet; a tombstone's `value_len`
//! must be zero. A zero-byte file is a legal run with no data.
//!
//! Blocks are compressed independently, and only when zstd actually shrinks
//! the payload; otherwise the block is stored raw with flag 0. There are no
//! block checksums.

mod cursor;
mod format;
mod reader;
mod writer;

pub use cursor::RunCursor;
pub use format::{
    BLOCK_HEADER_BYTES, COMPRESSION_NONE, COMPRESSION_ZSTD, DEFAULT_TARGET_BLOCK_BYTES,
};
pub use reader::{RunLookup, RunReader};
pub use writer::{RunWriter, WriterOptions};

#[cfg(test)]
mod tests;
