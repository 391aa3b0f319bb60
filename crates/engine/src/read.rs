//! Read path: the two `get` forms and the merged lookup.
//!
//! Layer order is active table → flushing slot → runs newest-first. The
//! first definitive answer wins: a live value is returned, a tombstone means
//! "no live value", and only plain absence consults the next (older) layer.
//! Any run error (including a run that fails to open) ends the lookup;
//! older runs are not consulted behind a failing one.

use arena::Arena;
use common::{ByteView, Result, StoreError, ValueKind};
use sstable::{RunLookup, RunReader};

use crate::Engine;

/// What the in-memory layers concluded, before any run is touched.
enum MemHit {
    Live(ByteView),
    Tombstone,
    Miss,
}

impl Engine {
    /// Point lookup, copying the value out.
    ///
    /// `Ok(None)` means no live value for `key`; whether the key was never
    /// written or its latest entry is a tombstone is deliberately not
    /// distinguishable here.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("key must not be empty".into()));
        }

        match self.memtable_lookup(key) {
            MemHit::Live(view) => return Ok(Some(view.to_vec())),
            MemHit::Tombstone => return Ok(None),
            MemHit::Miss => {}
        }

        // Run values are copied into a per-call scratch arena and out again
        // into the returned buffer; the scratch dies with the call.
        let mut scratch = Arena::new();
        match self.run_lookup(key, &mut scratch)? {
            RunLookup::Live(view) => Ok(Some(view.to_vec())),
            RunLookup::Tombstone => Ok(None),
            RunLookup::Miss => Ok(None),
        }
    }

    /// Point lookup placing the value bytes in `arena`.
    ///
    /// The returned view points into `arena` and stays valid for the
    /// arena's lifetime, independent of any later engine mutation. Memtable
    /// hits are copied over; run hits are read directly into `arena` by the
    /// run reader, so no second copy happens on that path.
    pub fn get_in(&self, key: &[u8], arena: &mut Arena) -> Result<Option<ByteView>> {
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("key must not be empty".into()));
        }

        match self.memtable_lookup(key) {
            MemHit::Live(view) => {
                let copied = arena.copy_bytes(view.as_slice()).ok_or_else(|| {
                    StoreError::ArenaAlloc("copying value into caller arena".into())
                })?;
                return Ok(Some(copied));
            }
            MemHit::Tombstone => return Ok(None),
            MemHit::Miss => {}
        }

        match self.run_lookup(key, arena)? {
            RunLookup::Live(view) => Ok(Some(view)),
            RunLookup::Tombstone => Ok(None),
            RunLookup::Miss => Ok(None),
        }
    }

    /// Consults the active table, then the flushing slot. Views returned
    /// here point into those tables' arenas and must be copied before they
    /// escape the engine.
    fn memtable_lookup(&self, key: &[u8]) -> MemHit {
        for table in std::iter::once(&self.active).chain(self.flushing.as_ref()) {
            if let Some(entry) = table.get(key) {
                return match entry.kind {
                    ValueKind::Live => MemHit::Live(entry.value),
                    ValueKind::Tombstone => MemHit::Tombstone,
                };
            }
        }
        MemHit::Miss
    }

    /// Walks the run list newest-first, opening each file on demand. The
    /// first definitive hit ends the walk; errors are surfaced immediately
    /// (fail-closed: an unreadable newer run must not unmask older data).
    fn run_lookup(&self, key: &[u8], dst: &mut Arena) -> Result<RunLookup> {
        for path in &self.runs {
            let mut reader = RunReader::open(path)?;
            match reader.get(key, dst)? {
                RunLookup::Miss => continue,
                definitive => return Ok(definitive),
            }
        }
        Ok(RunLookup::Miss)
    }
}
