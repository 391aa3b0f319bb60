use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use arena::Arena;
use byteorder::{ByteOrder, LittleEndian};
use common::{ByteView, Result, StoreError, ValueKind};
use tracing::trace;
use zstd::bulk::Decompressor;

use crate::format::{self, BLOCK_HEADER_BYTES, COMPRESSION_NONE, COMPRESSION_ZSTD};

/// The three ways a point lookup can resolve against a single run file.
///
/// `Miss` sends the engine on to the next (older) run; `Tombstone` ends the
/// search with "no live value"; `Live` ends it with the value, already
/// copied into the destination arena.
#[derive(Debug)]
pub enum RunLookup {
    Live(ByteView),
    Tombstone,
    Miss,
}

/// Reads one sorted-run file: sequential block decoding, point lookup, and
/// (through [`RunCursor`](crate::RunCursor)) forward iteration.
///
/// `open` records the file size and acquires a zstd decompression context
/// that is reused for every block. Blocks are decoded on demand into an
/// internal buffer; there is no index, so a lookup walks blocks from offset
/// zero and relies on the run's global ascending order to stop early.
pub struct RunReader {
    /// Kept for error messages.
    path: PathBuf,
    file: File,
    file_size: u64,
    decompressor: Decompressor<'static>,
    /// The current block's decompressed entry bytes.
    pub(crate) block: Vec<u8>,
}

impl std::fmt::Debug for RunReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunReader")
            .field("path", &self.path)
            .field("file_size", &self.file_size)
            .finish()
    }
}

impl RunReader {
    /// Opens a run file. A zero-byte file is a valid, empty run.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_size = file.metadata()?.len();
        let decompressor = Decompressor::new()?;
        Ok(Self {
            path,
            file,
            file_size,
            decompressor,
            block: Vec::new(),
        })
    }

    /// Point lookup for `key`, copying a live value into `dst`.
    ///
    /// Walks blocks from the start of the file, comparing entries in order.
    /// Since entries ascend across the whole run, the scan stops as soon as
    /// an entry key exceeds `key`.
    pub fn get(&mut self, key: &[u8], dst: &mut Arena) -> Result<RunLookup> {
        if key.is_empty() {
            return Err(StoreError::InvalidArgument(
                "search key must not be empty".into(),
            ));
        }

        let mut offset = 0u64;
        while let Some(advance) = self.load_block(offset)? {
            if self.block.is_empty() {
                return Err(StoreError::Corruption(format!(
                    "zero-sized block at offset {offset} in non-empty run {}",
                    self.path.display()
                )));
            }
            let mut pos = 0usize;
            while let Some(entry) = format::parse_entry(&self.block, pos)? {
                match self.block[entry.key.clone()].cmp(key) {
                    Ordering::Less => pos = entry.end,
                    Ordering::Equal => {
                        return match entry.kind {
                            ValueKind::Tombstone => Ok(RunLookup::Tombstone),
                            ValueKind::Live => {
                                let value = &self.block[entry.value.clone()];
                                let view = dst.copy_bytes(value).ok_or_else(|| {
                                    StoreError::ArenaAlloc(
                                        "copying run value into destination arena".into(),
                                    )
                                })?;
                                Ok(RunLookup::Live(view))
                            }
                        };
                    }
                    // Entries ascend across the whole run: the key cannot
                    // appear later in this file.
                    Ordering::Greater => return Ok(RunLookup::Miss),
                }
            }
            offset += advance;
        }
        trace!(path = %self.path.display(), "key absent from run");
        Ok(RunLookup::Miss)
    }

    /// Loads and decodes the block starting at `offset` into `self.block`.
    ///
    /// Returns the block's total on-disk footprint (header + payload), or
    /// `None` at clean end of file. Everything else — short header, payload
    /// past the file end, decompression error or size mismatch, size
    /// mismatch on a raw block — is corruption; an unknown compression flag
    /// is not-supported.
    pub(crate) fn load_block(&mut self, offset: u64) -> Result<Option<u64>> {
        if offset >= self.file_size {
            return Ok(None);
        }
        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; BLOCK_HEADER_BYTES];
        self.file.read_exact(&mut header).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                StoreError::Corruption(format!(
                    "truncated block header at offset {offset} in {}",
                    self.path.display()
                ))
            } else {
                StoreError::Io(err)
            }
        })?;
        let uncompressed_size = LittleEndian::read_u32(&header[0..4]) as usize;
        let on_disk_size = u64::from(LittleEndian::read_u32(&header[4..8]));
        let flag = header[8];

        if offset + BLOCK_HEADER_BYTES as u64 + on_disk_size > self.file_size {
            return Err(StoreError::Corruption(format!(
                "block at offset {offset} extends past end of {}",
                self.path.display()
            )));
        }

        let mut payload = vec![0u8; on_disk_size as usize];
        self.file.read_exact(&mut payload).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                StoreError::Corruption(format!(
                    "truncated block payload at offset {offset} in {}",
                    self.path.display()
                ))
            } else {
                StoreError::Io(err)
            }
        })?;

        match flag {
            COMPRESSION_ZSTD => {
                if uncompressed_size == 0 {
                    if on_disk_size > 0 {
                        return Err(StoreError::Corruption(
                            "compressed block declares zero uncompressed size".into(),
                        ));
                    }
                    self.block.clear();
                } else {
                    if payload.is_empty() {
                        return Err(StoreError::Corruption(
                            "compressed block has empty payload".into(),
                        ));
                    }
                    let decoded = self
                        .decompressor
                        .decompress(&payload, uncompressed_size)
                        .map_err(|err| {
                            StoreError::Corruption(format!(
                                "zstd decompression failed at offset {offset}: {err}"
                            ))
                        })?;
                    if decoded.len() != uncompressed_size {
                        return Err(StoreError::Corruption(format!(
                            "block at offset {offset} decompressed to {} bytes, expected {}",
                            decoded.len(),
                            uncompressed_size
                        )));
                    }
                    self.block = decoded;
                }
            }
            COMPRESSION_NONE => {
                if uncompressed_size as u64 != on_disk_size {
                    return Err(StoreError::Corruption(format!(
                        "raw block at offset {offset} declares {uncompressed_size} bytes but stores {on_disk_size}"
                    )));
                }
                self.block = payload;
            }
            other => {
                return Err(StoreError::NotSupported(format!(
                    "unknown compression flag {other} at offset {offset}"
                )));
            }
        }

        Ok(Some(BLOCK_HEADER_BYTES as u64 + on_disk_size))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}
