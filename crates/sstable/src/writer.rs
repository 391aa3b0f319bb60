use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use common::{Result, StoreError};
use memtable::Memtable;
use tracing::{debug, warn};
use zstd::bulk::Compressor;

use crate::format::{
    append_entry, COMPRESSION_NONE, COMPRESSION_ZSTD, DEFAULT_TARGET_BLOCK_BYTES,
};

/// Run serialization knobs.
///
/// `target_block_bytes` is a flush threshold, not a cap: the block buffer is
/// flushed after the append that reaches it, so a block can grow to
/// `2 * target − 1` bytes — or larger still when a single entry alone
/// exceeds the target, in which case that entry forms its own block. A zero
/// target resolves to [`DEFAULT_TARGET_BLOCK_BYTES`].
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub compression_enabled: bool,
    pub compression_level: i32,
    pub target_block_bytes: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression_enabled: true,
            compression_level: zstd::DEFAULT_COMPRESSION_LEVEL,
            target_block_bytes: DEFAULT_TARGET_BLOCK_BYTES,
        }
    }
}

/// Serializes a [`Memtable`] into a sorted-run file.
///
/// The zstd compression context is acquired once at construction and reused
/// for every block this writer produces.
pub struct RunWriter {
    target_block_bytes: usize,
    compressor: Option<Compressor<'static>>,
}

impl RunWriter {
    /// Builds a writer, acquiring a compression context if compression is
    /// enabled. Context acquisition failure surfaces as an I/O error.
    pub fn new(options: WriterOptions) -> Result<Self> {
        let target_block_bytes = if options.target_block_bytes == 0 {
            DEFAULT_TARGET_BLOCK_BYTES
        } else {
            options.target_block_bytes
        };
        let compressor = if options.compression_enabled {
            Some(Compressor::new(options.compression_level)?)
        } else {
            None
        };
        Ok(Self {
            target_block_bytes,
            compressor,
        })
    }

    /// Materializes `table` in cursor (ascending key) order into a new file
    /// at `path`, truncating anything already there.
    ///
    /// An empty table produces a zero-byte file, which is a valid run. On
    /// I/O failure the partial file is left in place; the caller decides
    /// what the loss means (the engine treats that flush's data as gone).
    pub fn write_memtable(&mut self, table: &Memtable, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        let mut block = Vec::with_capacity(self.target_block_bytes * 2);

        let mut entries = 0usize;
        let mut blocks = 0usize;
        let mut cursor = table.cursor();
        cursor.seek_first();
        while let Some((key, entry)) = cursor.entry() {
            append_entry(&mut block, key, entry)?;
            entries += 1;
            cursor.next();

            // Flush on the append that reaches the target, and once more for
            // whatever remains when the cursor runs out.
            if block.len() >= self.target_block_bytes || (!cursor.valid() && !block.is_empty()) {
                self.flush_block(&mut out, &mut block)?;
                blocks += 1;
            }
        }
        out.flush()?;
        debug!(
            path = %path.display(),
            entries, blocks, "run file written"
        );
        Ok(())
    }

    /// Frames and writes one block, compressed when that actually helps.
    fn flush_block(&mut self, out: &mut BufWriter<File>, block: &mut Vec<u8>) -> Result<()> {
        let uncompressed_size = u32::try_from(block.len()).map_err(|_| {
            StoreError::InvalidArgument(format!(
                "block of {} bytes exceeds u32 size field",
                block.len()
            ))
        })?;

        let mut compressed: Option<Vec<u8>> = None;
        if let Some(ctx) = self.compressor.as_mut() {
            match ctx.compress(block.as_slice()) {
                Ok(buf) if buf.len() < block.len() => compressed = Some(buf),
                // Did not shrink: store raw.
                Ok(_) => {}
                Err(err) => {
                    warn!("zstd compression failed, storing block raw: {err}");
                }
            }
        }
        let (flag, payload): (u8, &[u8]) = match compressed.as_deref() {
            Some(buf) => (COMPRESSION_ZSTD, buf),
            None => (COMPRESSION_NONE, block.as_slice()),
        };

        out.write_u32::<LittleEndian>(uncompressed_size)?;
        out.write_u32::<LittleEndian>(payload.len() as u32)?;
        out.write_u8(flag)?;
        out.write_all(payload)?;

        block.clear();
        Ok(())
    }
}
