//! # Engine - LoamKV Storage Engine
//!
//! The central coordinator tying the [`memtable`] and [`sstable`] crates
//! into a single-writer LSM store.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → active memtable insert             │
//! │              |                                │
//! │              |  (usage >= threshold?)         │
//! │              |            yes                 │
//! │              v                                │
//! │   rotate active → flushing slot               │
//! │   RunWriter → NNNNNN.sst  (newest first)      │
//! │   release flushing table + arena              │
//! │                                               │
//! │ read.rs → active → flushing → runs newest-first│
//! │            (first definitive hit wins)        │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module     | Purpose                                             |
//! |------------|-----------------------------------------------------|
//! | `lib.rs`   | `Engine` struct, constructor, accessors, `Debug`    |
//! | `write.rs` | `put()`, `delete()`, `force_flush()`, flush + names |
//! | `read.rs`  | the two `get` forms and the merged lookup           |
//!
//! ## Durability
//!
//! None between a write acknowledgment and the next flush: there is no WAL
//! in the write path yet (the `wal` crate exists for a future revision), no
//! manifest, and `open` never scans the directory. The engine is write-only
//! toward its directory; run files accumulate and are never deleted here.

mod read;
mod write;

use std::fmt;
use std::path::{Path, PathBuf};

use common::{Result, StoreError};
use memtable::Memtable;
use sstable::WriterOptions;

/// The single-writer LSM engine.
///
/// # Write path
///
/// 1. Validate the key (non-empty, `u32`-sized) and value (`u32`-sized).
/// 2. Insert into the active memtable (copying bytes into its arena).
/// 3. If `approximate_memory_usage() >= flush_threshold`, rotate the active
///    table into the flushing slot, serialize it to run `NNNNNN.sst`, and
///    release it.
///
/// # Read path
///
/// Active table, then the flushing slot (always empty between calls in this
/// synchronous design), then runs newest-first. The first live value or
/// tombstone decides; absence falls through to older layers.
pub struct Engine {
    pub(crate) active: Memtable,
    /// Transient holder for a retired table during its serialization. Only
    /// ever occupied inside a single `put`/`delete` call.
    pub(crate) flushing: Option<Memtable>,
    /// Full paths of run files, newest first. Lookup order is load-bearing:
    /// a newer entry must shadow older files.
    pub(crate) runs: Vec<PathBuf>,
    pub(crate) dir: PathBuf,
    /// Id used for the next run filename; monotonically increasing from 1.
    pub(crate) next_run_id: u64,
    /// Memtable usage (bytes) at which a write triggers a flush.
    pub(crate) flush_threshold: usize,
    pub(crate) writer_options: WriterOptions,
}

impl Engine {
    /// Opens an engine over `dir`, creating the directory if missing.
    ///
    /// Fails with an I/O error if `dir` exists and is not a directory.
    /// Existing run files are ignored, not loaded: recovery scanning is
    /// outside this core.
    pub fn open<P: AsRef<Path>>(dir: P, flush_threshold: usize) -> Result<Self> {
        Self::with_options(dir, flush_threshold, WriterOptions::default())
    }

    /// [`open`](Engine::open) with explicit run-serialization options.
    pub fn with_options<P: AsRef<Path>>(
        dir: P,
        flush_threshold: usize,
        writer_options: WriterOptions,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() && !dir.is_dir() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{} exists and is not a directory", dir.display()),
            )));
        }
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            active: Memtable::new(),
            flushing: None,
            runs: Vec::new(),
            dir,
            next_run_id: 1,
            flush_threshold,
            writer_options,
        })
    }

    /// Current flush threshold in bytes.
    #[must_use]
    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    /// Updates the flush threshold. Takes effect from the next write.
    pub fn set_flush_threshold(&mut self, threshold: usize) {
        self.flush_threshold = threshold;
    }

    /// Number of run files this engine has written, newest first.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Entries (tombstones included) currently in the active table.
    #[must_use]
    pub fn memtable_len(&self) -> usize {
        self.active.len()
    }

    /// The engine's directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("dir", &self.dir)
            .field("flush_threshold", &self.flush_threshold)
            .field("memtable_entries", &self.active.len())
            .field("memtable_usage", &self.active.approximate_memory_usage())
            .field("run_count", &self.runs.len())
            .field("next_run_id", &self.next_run_id)
            .finish()
    }
}

#[cfg(test)]
mod tests;
