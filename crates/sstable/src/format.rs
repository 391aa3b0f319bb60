//! Shared constants and entry codec for the run block format.

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};
use common::{Result, StoreError, ValueEntry, ValueKind};

/// Bytes of a block header: `uncompressed_size` + `on_disk_size` + flag.
pub const BLOCK_HEADER_BYTES: usize = 4 + 4 + 1;

/// Block payload stored as-is.
pub const COMPRESSION_NONE: u8 = 0;
/// Block payload is the zstd-compressed form of the entry concatenation.
pub const COMPRESSION_ZSTD: u8 = 1;

/// Block-size target used when the writer is configured with zero.
pub const DEFAULT_TARGET_BLOCK_BYTES: usize = 4096;

/// Smallest possible serialized entry: `key_len` + tag + `value_len` (a
/// one-byte key and empty value add just the key byte on top of this).
const MIN_ENTRY_BYTES: usize = 4 + 1 + 4;

/// Serializes one entry onto the end of a block buffer.
///
/// Tombstones are written with a zero value length regardless of the entry's
/// view (the [`ValueEntry`] invariant keeps it empty anyway). Key or value
/// lengths that do not fit the u32 size fields are rejected.
pub(crate) fn append_entry(block: &mut Vec<u8>, key: &[u8], entry: &ValueEntry) -> Result<()> {
    let key_len = u32::try_from(key.len()).map_err(|_| {
        StoreError::InvalidArgument(format!("key of {} bytes exceeds u32 size field", key.len()))
    })?;
    let value: &[u8] = match entry.kind {
        ValueKind::Live => entry.value.as_slice(),
        ValueKind::Tombstone => &[],
    };
    let value_len = u32::try_from(value.len()).map_err(|_| {
        StoreError::InvalidArgument(format!(
            "value of {} bytes exceeds u32 size field",
            value.len()
        ))
    })?;

    block.extend_from_slice(&key_len.to_le_bytes());
    block.extend_from_slice(key);
    block.push(entry.kind as u8);
    block.extend_from_slice(&value_len.to_le_bytes());
    block.extend_from_slice(value);
    Ok(())
}

/// An entry decoded in place: byte ranges into the block buffer plus the
/// offset where the next entry starts.
#[derive(Debug, Clone)]
pub(crate) struct EntryRef {
    pub key: Range<usize>,
    pub kind: ValueKind,
    pub value: Range<usize>,
    /// Offset of the byte after this entry.
    pub end: usize,
}

/// Decodes the entry starting at `pos` in a decompressed block.
///
/// `Ok(None)` is the clean end of the block (`pos` exactly at the buffer
/// end). Every boundary overrun, unknown tag, or tombstone with a nonzero
/// value length is corruption.
pub(crate) fn parse_entry(block: &[u8], pos: usize) -> Result<Option<EntryRef>> {
    if pos == block.len() {
        return Ok(None);
    }
    if pos + MIN_ENTRY_BYTES > block.len() {
        return Err(StoreError::Corruption(format!(
            "entry at block offset {pos} too short for its headers"
        )));
    }

    let key_len = LittleEndian::read_u32(&block[pos..pos + 4]) as usize;
    let key_start = pos + 4;
    let key_end = key_start
        .checked_add(key_len)
        .filter(|end| end + 1 + 4 <= block.len())
        .ok_or_else(|| {
            StoreError::Corruption(format!(
                "key at block offset {pos} extends past block boundary"
            ))
        })?;

    let tag = block[key_end];
    let kind = ValueKind::from_u8(tag).ok_or_else(|| {
        StoreError::Corruption(format!("unknown value tag {tag} at block offset {pos}"))
    })?;

    let value_len = LittleEndian::read_u32(&block[key_end + 1..key_end + 5]) as usize;
    if kind == ValueKind::Tombstone && value_len != 0 {
        return Err(StoreError::Corruption(format!(
            "tombstone at block offset {pos} carries {value_len} value bytes"
        )));
    }
    let value_start = key_end + 5;
    let value_end = value_start
        .checked_add(value_len)
        .filter(|end| *end <= block.len())
        .ok_or_else(|| {
            StoreError::Corruption(format!(
                "value at block offset {pos} extends past block boundary"
            ))
        })?;

    Ok(Some(EntryRef {
        key: key_start..key_end,
        kind,
        value: value_start..value_end,
        end: value_end,
    }))
}
