//! # CLI - LoamKV Interactive Shell
//!
//! A REPL over the LoamKV engine. Reads commands from stdin, executes them
//! against the engine, and prints results to stdout. Works interactively and
//! scripted (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! PUT key value   Insert or update a key-value pair
//! GET key         Look up a key (prints value or "(nil)")
//! DEL key         Delete a key (writes a tombstone)
//! FLUSH           Force-flush the memtable to a run file
//! STATS           Print engine debug info
//! HELP            Show the command list
//! EXIT / QUIT     Shut down
//! ```
//!
//! ## Configuration
//!
//! All settings are environment variables:
//!
//! ```text
//! LOAM_DIR         engine directory            (default: "data/loam")
//! LOAM_FLUSH_KB    flush threshold in KiB      (default: 1024 = 1 MiB)
//! LOAM_COMPRESS    zstd-compress run blocks    (default: "true")
//! LOAM_ZSTD_LEVEL zstd compression level       (default: 3)
//! LOAM_BLOCK_BYTES target block size in bytes  (default: 4096)
//! ```
//!
//! `RUST_LOG` controls diagnostic logging (e.g. `RUST_LOG=debug`).

use std::io::{self, BufRead, Write};

use anyhow::Result;
use engine::Engine;
use sstable::WriterOptions;
use tracing_subscriber::EnvFilter;

/// Reads a configuration value from the environment, falling back to
/// `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = env_or("LOAM_DIR", "data/loam");
    let flush_kb: usize = env_or("LOAM_FLUSH_KB", "1024").parse().unwrap_or(1024);
    let compress: bool = env_or("LOAM_COMPRESS", "true").parse().unwrap_or(true);
    let level: i32 = env_or("LOAM_ZSTD_LEVEL", "3").parse().unwrap_or(3);
    let block_bytes: usize = env_or("LOAM_BLOCK_BYTES", "4096").parse().unwrap_or(4096);

    let mut engine = Engine::with_options(
        &dir,
        flush_kb * 1024,
        WriterOptions {
            compression_enabled: compress,
            compression_level: level,
            target_block_bytes: block_bytes,
        },
    )?;

    println!(
        "LoamKV started (dir={dir}, flush={flush_kb}KiB, compress={compress}, block={block_bytes}B)"
    );
    println!("Commands: PUT key value | GET key | DEL key | FLUSH | STATS | HELP | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "PUT" => match parts.next() {
                    Some(key) => {
                        let value: String = parts.collect::<Vec<&str>>().join(" ");
                        match engine.put(key.as_bytes(), value.as_bytes()) {
                            Ok(()) => println!("OK"),
                            Err(err) => println!("ERR {err}"),
                        }
                    }
                    None => println!("ERR usage: PUT key value"),
                },
                "GET" => match parts.next() {
                    Some(key) => match engine.get(key.as_bytes()) {
                        Ok(Some(value)) => println!("{}", String::from_utf8_lossy(&value)),
                        Ok(None) => println!("(nil)"),
                        Err(err) => println!("ERR {err}"),
                    },
                    None => println!("ERR usage: GET key"),
                },
                "DEL" => match parts.next() {
                    Some(key) => match engine.delete(key.as_bytes()) {
                        Ok(()) => println!("OK"),
                        Err(err) => println!("ERR {err}"),
                    },
                    None => println!("ERR usage: DEL key"),
                },
                "FLUSH" => match engine.force_flush() {
                    Ok(()) => println!("OK ({} runs)", engine.run_count()),
                    Err(err) => println!("ERR {err}"),
                },
                "STATS" => println!("{engine:#?}"),
                "HELP" => {
                    println!("PUT key value | GET key | DEL key | FLUSH | STATS | HELP | EXIT")
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => println!("ERR unknown command: {other}"),
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
