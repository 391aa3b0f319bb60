//! Write path: `put()`, `delete()`, `force_flush()`, and the flush itself.
//!
//! All mutations land in the active memtable; once its estimated usage
//! reaches the flush threshold the table is rotated out and serialized to a
//! new run file before the triggering call returns. Everything here is
//! synchronous — there is never a flush in progress across calls.

use common::{Result, StoreError};
use memtable::Memtable;
use sstable::RunWriter;
use tracing::{debug, warn};

use crate::Engine;

impl Engine {
    /// Inserts or replaces `key` with `value`.
    ///
    /// May trigger a flush; in that case the write is on disk when this
    /// returns. Fails with `InvalidArgument` for an empty key or for a key
    /// or value that does not fit a `u32` size field.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        validate_key(key)?;
        validate_len("value", value)?;

        self.active.put(key, value)?;
        self.maybe_flush()
    }

    /// Writes a tombstone for `key`, shadowing any older value on disk. The
    /// tombstone is recorded whether or not the key is currently present.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        validate_key(key)?;

        self.active.delete(key)?;
        self.maybe_flush()
    }

    /// Flushes the active memtable regardless of the threshold. A no-op when
    /// it holds no data.
    pub fn force_flush(&mut self) -> Result<()> {
        if self.active.is_empty() {
            return Ok(());
        }
        self.flush_memtable()
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.active.approximate_memory_usage() >= self.flush_threshold {
            self.flush_memtable()?;
        }
        Ok(())
    }

    /// Rotates the active table into the flushing slot, serializes it to a
    /// new run, and releases it.
    ///
    /// On a failed run write the flushing slot is cleared anyway: the data
    /// of that flush is acknowledged lost (there is no WAL to replay), and
    /// the fresh active table keeps accepting writes.
    pub(crate) fn flush_memtable(&mut self) -> Result<()> {
        // Structurally unreachable in this synchronous design; kept as a
        // guard on the single-writer invariant.
        if self.flushing.is_some() {
            return Err(StoreError::Io(std::io::Error::other(
                "flush requested while another flush is in progress",
            )));
        }

        // Rotate: the new active table allocates lazily, so installing it
        // cannot fail and the flushing slot never needs swapping back.
        let retired = std::mem::replace(&mut self.active, Memtable::new());
        self.flushing = Some(retired);

        let result = self.write_flushing_table();

        // Release the retired table and its arena in every outcome.
        self.flushing = None;
        result
    }

    fn write_flushing_table(&mut self) -> Result<()> {
        let Some(table) = self.flushing.as_ref() else {
            return Ok(());
        };
        // An empty table writes no run at all.
        if table.arena_bytes_used() == 0 {
            debug!("flush of empty memtable skipped");
            return Ok(());
        }

        let filename = run_filename(self.next_run_id);
        let path = self.dir.join(&filename);
        debug!(
            file = %filename,
            entries = table.len(),
            bytes = table.arena_bytes_used(),
            "flushing memtable"
        );

        let mut writer = RunWriter::new(self.writer_options.clone())?;
        if let Err(err) = writer.write_memtable(table, &path) {
            warn!(
                file = %filename,
                entries = table.len(),
                "run write failed, data of this flush is lost: {err}"
            );
            return Err(err);
        }

        self.runs.insert(0, path); // newest first
        self.next_run_id += 1;
        Ok(())
    }
}

/// Run files are `NNNNNN.sst`, zero-padded, ids ascending from 1.
pub(crate) fn run_filename(id: u64) -> String {
    format!("{id:06}.sst")
}

fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument("key must not be empty".into()));
    }
    validate_len("key", key)
}

fn validate_len(what: &str, bytes: &[u8]) -> Result<()> {
    if u32::try_from(bytes.len()).is_err() {
        return Err(StoreError::InvalidArgument(format!(
            "{what} of {} bytes exceeds u32 size field",
            bytes.len()
        )));
    }
    Ok(())
}
