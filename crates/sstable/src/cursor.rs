use common::{StoreError, ValueKind};

use crate::format::{self, EntryRef};
use crate::reader::RunReader;

/// A forward cursor over a run file's entries in on-disk (ascending key)
/// order.
///
/// The cursor drives its reader's block decoding: `seek_first` loads the
/// first block, `next` walks entries and crosses block boundaries as they
/// are exhausted. Once past the last entry the cursor is invalid with an
/// `Ok` status; a decode failure leaves it invalid with that error in
/// [`status`](RunCursor::status).
///
/// There is no index, so [`seek`](RunCursor::seek) is `seek_first` followed
/// by `next` until the key is no longer below the target.
pub struct RunCursor<'r> {
    reader: &'r mut RunReader,
    /// File offset of the block currently decoded in the reader.
    block_offset: u64,
    /// That block's total on-disk footprint (header + payload).
    block_advance: u64,
    /// Offset within the decoded block of the next entry to parse.
    next_pos: usize,
    current: Option<EntryRef>,
    status: Option<StoreError>,
}

impl<'r> RunCursor<'r> {
    /// A cursor over `reader`'s file. Unpositioned until the first seek.
    pub fn new(reader: &'r mut RunReader) -> Self {
        Self {
            reader,
            block_offset: 0,
            block_advance: 0,
            next_pos: 0,
            current: None,
            status: None,
        }
    }

    /// Positions at the first entry of the file, if any. An empty run leaves
    /// the cursor invalid with an `Ok` status.
    pub fn seek_first(&mut self) {
        self.status = None;
        self.enter_block(0);
    }

    /// Positions at the smallest key `>= target`, if any.
    pub fn seek(&mut self, target: &[u8]) {
        self.seek_first();
        loop {
            let below = match self.key() {
                Some(key) => key < target,
                None => false,
            };
            if !below {
                return;
            }
            self.next();
        }
    }

    /// Advances to the next entry, crossing into the next block when the
    /// current one is exhausted.
    pub fn next(&mut self) {
        if self.current.is_none() {
            return;
        }
        match format::parse_entry(&self.reader.block, self.next_pos) {
            Ok(Some(entry)) => {
                self.next_pos = entry.end;
                self.current = Some(entry);
            }
            // Clean end of block: move to the next one.
            Ok(None) => self.enter_block(self.block_offset + self.block_advance),
            Err(err) => self.fail(err),
        }
    }

    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// The current key; defined only while valid.
    pub fn key(&self) -> Option<&[u8]> {
        self.current
            .as_ref()
            .map(|entry| &self.reader.block[entry.key.clone()])
    }

    /// The current value slot (kind + value bytes); defined only while
    /// valid. The bytes point into the decoded block and are invalidated by
    /// the next block load.
    pub fn entry(&self) -> Option<(ValueKind, &[u8])> {
        self.current
            .as_ref()
            .map(|entry| (entry.kind, &self.reader.block[entry.value.clone()]))
    }

    /// `None` while healthy (including past the end); the decode error that
    /// invalidated the cursor otherwise.
    pub fn status(&self) -> Option<&StoreError> {
        self.status.as_ref()
    }

    /// Loads the block at `offset` and positions at its first entry.
    fn enter_block(&mut self, offset: u64) {
        match self.reader.load_block(offset) {
            Ok(Some(advance)) => {
                if self.reader.block.is_empty() {
                    self.fail(StoreError::Corruption(format!(
                        "zero-sized block at offset {offset} in non-empty run {}",
                        self.reader.path().display()
                    )));
                    return;
                }
                self.block_offset = offset;
                self.block_advance = advance;
                match format::parse_entry(&self.reader.block, 0) {
                    Ok(Some(entry)) => {
                        self.next_pos = entry.end;
                        self.current = Some(entry);
                    }
                    // Unreachable for a non-empty block, but treat it as the
                    // end of the file rather than inventing an error.
                    Ok(None) => self.current = None,
                    Err(err) => self.fail(err),
                }
            }
            // Clean end of file.
            Ok(None) => self.current = None,
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: StoreError) {
        self.status = Some(err);
        self.current = None;
    }
}
