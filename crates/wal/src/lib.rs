//! # WAL — Write-Ahead Log
//!
//! A checksummed record log for the LoamKV engine's mutations.
//!
//! The engine does not construct a WAL yet: in the current core, data
//! between a `put` acknowledgment and the next flush is acknowledged
//! volatile, and integrating this log into the write path is a future
//! revision. The codec, writer, and reader below are complete and tested so
//! that integration is a wiring change, not a format design session.
//!
//! ## Binary record format
//!
//! ```text
//! [record_len: u32 LE][crc32: u32 LE][body ...]
//! ```
//!
//! Body (Put):    `[op=0: u8][key_len: u32][key][value_len: u32][value]`
//! Body (Delete): `[op=1: u8][key_len: u32][key]`
//!
//! `record_len` counts the 4-byte CRC plus the body, but not itself. The
//! CRC covers the body only. Records carry no sequence numbers — the engine
//! is single-writer and strictly ordered, so replay order is record order.
//!
//! A record torn by a crash mid-append is detected on replay (short frame or
//! CRC mismatch at the tail) and treated as a clean end of log.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use thiserror::Error;

/// Upper bound on a single record frame; anything larger is corruption.
const MAX_RECORD_BYTES: u32 = 64 * 1024 * 1024;

const OP_PUT: u8 = 0;
const OP_DELETE: u8 = 1;

/// One logged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Errors from WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record failed CRC validation, declared an absurd length, or carried
    /// an unknown op code.
    #[error("corrupt record")]
    Corrupt,
}

/// Append-only writer.
///
/// Each record is serialized into a reusable buffer, checksummed, and
/// written with a single `write_all`. With `sync` enabled every append is
/// followed by `sync_all` so the record is durable before the call returns.
pub struct WalWriter {
    file: File,
    sync: bool,
    /// Reusable scratch buffer; cleared, never shrunk.
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a log file in append mode.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Serializes `record` and appends its frame to the log.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        self.buf.clear();
        // Reserve the 8-byte frame header (record_len + crc), filled below.
        self.buf.extend_from_slice(&[0u8; 8]);

        match record {
            WalRecord::Put { key, value } => {
                self.buf.write_u8(OP_PUT)?;
                self.buf.write_u32::<LittleEndian>(checked_len(key)?)?;
                self.buf.extend_from_slice(key);
                self.buf.write_u32::<LittleEndian>(checked_len(value)?)?;
                self.buf.extend_from_slice(value);
            }
            WalRecord::Delete { key } => {
                self.buf.write_u8(OP_DELETE)?;
                self.buf.write_u32::<LittleEndian>(checked_len(key)?)?;
                self.buf.extend_from_slice(key);
            }
        }

        let body = &self.buf[8..];
        let mut hasher = Crc32::new();
        hasher.update(body);
        let crc = hasher.finalize();

        let record_len = body.len() as u64 + 4;
        if record_len > u64::from(MAX_RECORD_BYTES) {
            return Err(WalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "record exceeds the maximum frame size",
            )));
        }
        self.buf[0..4].copy_from_slice(&(record_len as u32).to_le_bytes());
        self.buf[4..8].copy_from_slice(&crc.to_le_bytes());

        self.file.write_all(&self.buf)?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Forces buffered appends to stable storage. Useful with `sync` off
    /// when the caller wants durability at batch boundaries.
    pub fn sync_to_disk(&mut self) -> Result<(), WalError> {
        self.file.sync_all()?;
        Ok(())
    }
}

fn checked_len(bytes: &[u8]) -> Result<u32, WalError> {
    u32::try_from(bytes.len()).map_err(|_| {
        WalError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "field exceeds u32 length",
        ))
    })
}

/// Sequential reader yielding every intact record.
///
/// Generic over `Read` so tests can replay from in-memory buffers.
pub struct WalReader<R: Read> {
    rdr: BufReader<R>,
}

impl WalReader<File> {
    /// Opens an existing log for replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let file = File::open(path)?;
        Ok(WalReader {
            rdr: BufReader::new(file),
        })
    }
}

impl<R: Read> WalReader<R> {
    pub fn from_reader(reader: R) -> Self {
        WalReader {
            rdr: BufReader::new(reader),
        }
    }

    /// Replays every complete record in order, calling `apply` for each.
    ///
    /// Termination:
    /// - clean EOF, or a truncated frame at the tail (crash mid-append):
    ///   `Ok(())` after all complete records before it;
    /// - CRC mismatch, absurd length, or unknown op code:
    ///   `Err(WalError::Corrupt)`;
    /// - any other I/O failure: `Err(WalError::Io)`.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(WalRecord),
    {
        let mut body = Vec::with_capacity(256);
        loop {
            let record_len = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };
            if record_len <= 4 || record_len > MAX_RECORD_BYTES {
                return Err(WalError::Corrupt);
            }

            let crc = match self.rdr.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };

            body.clear();
            body.resize((record_len - 4) as usize, 0);
            match self.rdr.read_exact(&mut body) {
                Ok(()) => {}
                // torn tail from a crash mid-append
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            }

            let mut hasher = Crc32::new();
            hasher.update(&body);
            if hasher.finalize() != crc {
                return Err(WalError::Corrupt);
            }

            apply(parse_body(&body)?);
        }
    }
}

/// Decodes a checksum-verified record body.
fn parse_body(body: &[u8]) -> Result<WalRecord, WalError> {
    let mut cur = body;
    let op = cur.read_u8().map_err(|_| WalError::Corrupt)?;
    let key_len = cur.read_u32::<LittleEndian>().map_err(|_| WalError::Corrupt)? as usize;
    if key_len > cur.len() {
        return Err(WalError::Corrupt);
    }
    let mut key = vec![0u8; key_len];
    cur.read_exact(&mut key).map_err(|_| WalError::Corrupt)?;

    match op {
        OP_PUT => {
            let value_len = cur.read_u32::<LittleEndian>().map_err(|_| WalError::Corrupt)? as usize;
            if value_len != cur.len() {
                return Err(WalError::Corrupt);
            }
            let mut value = vec![0u8; value_len];
            cur.read_exact(&mut value).map_err(|_| WalError::Corrupt)?;
            Ok(WalRecord::Put { key, value })
        }
        OP_DELETE => {
            if !cur.is_empty() {
                return Err(WalError::Corrupt);
            }
            Ok(WalRecord::Delete { key })
        }
        _ => Err(WalError::Corrupt),
    }
}
