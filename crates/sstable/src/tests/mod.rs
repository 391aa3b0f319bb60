
use anyhow::Result;
use memtable::Memtable;

use crate::{RunWriter, WriterOptions};

/// Writer options for tests that want deterministic raw framing.
pub fn raw_options(target_block_bytes: usize) -> WriterOptions {
    WriterOptions {
        compression_enabled: false,
        target_block_bytes,
        ..WriterOptions::default()
    }
}

/// Writes `table` to `path` with the given options.
pub fn write_table(
    table: &Memtable,
    path: &std::path::Path,
    options: WriterOptions,
) -> Result<()> {
    let mut writer = RunWriter::new(options)?;
    writer.write_memtable(table, path)?;
    Ok(())
}

/// Decodes every block of a run file into `(uncompressed_size, flag,
/// decoded_payload)` triples, without going through `RunReader`.
pub fn decode_file_blocks(raw: &[u8]) -> Vec<(u32, u8, Vec<u8>)> {
    let mut blocks = Vec::new();
    let mut pos = 0usize;
    while pos < raw.len() {
        let uncompressed = u32::from_le_bytes(raw[pos..pos + 4].try_into().unwrap());
        let on_disk = u32::from_le_bytes(raw[pos + 4..pos + 8].try_into().unwrap()) as usize;
        let flag = raw[pos + 8];
        let payload = &raw[pos + 9..pos + 9 + on_disk];
        let decoded = match flag {
            crate::COMPRESSION_NONE => payload.to_vec(),
            crate::COMPRESSION_ZSTD => {
                zstd::bulk::decompress(payload, uncompressed as usize).unwrap()
            }
            other => panic!("unexpected compression flag {other}"),
        };
        blocks.push((uncompressed, flag, decoded));
        pos += 9 + on_disk;
    }
    blocks
}

/// Splits a decoded block payload into `(key, tag, value)` triples.
pub fn decode_entries(payload: &[u8]) -> Vec<(Vec<u8>, u8, Vec<u8>)> {
    let mut entries = Vec::new();
    let mut pos = 0usize;
    while pos < payload.len() {
        let key_len = u32::from_le_bytes(payload[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        let key = payload[pos..pos + key_len].to_vec();
        pos += key_len;
        let tag = payload[pos];
        pos += 1;
        let value_len = u32::from_le_bytes(payload[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        let value = payload[pos..pos + value_len].to_vec();
        pos += value_len;
        entries.push((key, tag, value));
    }
    entries
}
