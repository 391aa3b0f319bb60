use anyhow::Result;
use tempfile::tempdir;

use super::helpers::{count_sst_files, sst_filenames};
use crate::write::run_filename;
use crate::Engine;

const BIG_THRESHOLD: usize = 1024 * 1024;

#[test]
fn run_filenames_are_zero_padded() {
    assert_eq!(run_filename(1), "000001.sst");
    assert_eq!(run_filename(42), "000042.sst");
    assert_eq!(run_filename(1_000_000), "1000000.sst");
}

#[test]
fn threshold_write_flushes_exactly_one_run() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");
    let mut engine = Engine::open(&db, 10)?;

    engine.put(b"key_sstable", b"value_sstable_long")?;

    assert_eq!(count_sst_files(&db), 1);
    assert_eq!(engine.run_count(), 1);
    assert_eq!(engine.memtable_len(), 0);
    assert_eq!(engine.get(b"key_sstable")?, Some(b"value_sstable_long".to_vec()));
    Ok(())
}

#[test]
fn flushes_number_their_runs_sequentially() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");
    let mut engine = Engine::open(&db, BIG_THRESHOLD)?;

    for i in 0..3u32 {
        engine.put(format!("key{i}").as_bytes(), b"value")?;
        engine.force_flush()?;
    }

    assert_eq!(
        sst_filenames(&db),
        vec!["000001.sst", "000002.sst", "000003.sst"]
    );
    assert_eq!(engine.run_count(), 3);
    Ok(())
}

#[test]
fn force_flush_on_empty_memtable_is_a_noop() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");
    let mut engine = Engine::open(&db, BIG_THRESHOLD)?;

    engine.force_flush()?;
    assert_eq!(count_sst_files(&db), 0);
    assert_eq!(engine.run_count(), 0);
    Ok(())
}

#[test]
fn flush_resets_the_active_memtable() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path().join("db"), BIG_THRESHOLD)?;

    engine.put(b"a", b"1")?;
    engine.put(b"b", b"2")?;
    assert_eq!(engine.memtable_len(), 2);

    engine.force_flush()?;
    assert_eq!(engine.memtable_len(), 0);

    // and the data remains readable from the run
    assert_eq!(engine.get(b"a")?, Some(b"1".to_vec()));
    assert_eq!(engine.get(b"b")?, Some(b"2".to_vec()));
    Ok(())
}

#[test]
fn tombstones_survive_the_flush() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = Engine::open(dir.path().join("db"), BIG_THRESHOLD)?;

    engine.put(b"k", b"v")?;
    engine.force_flush()?;

    engine.delete(b"k")?;
    engine.force_flush()?;

    // run 2 (tombstone) must shadow run 1 (live value)
    assert_eq!(engine.run_count(), 2);
    assert_eq!(engine.get(b"k")?, None);
    Ok(())
}

#[test]
fn lowering_the_threshold_takes_effect_on_the_next_write() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("db");
    let mut engine = Engine::open(&db, BIG_THRESHOLD)?;

    engine.put(b"k", b"buffered")?;
    assert_eq!(engine.run_count(), 0);

    engine.set_flush_threshold(1);
    assert_eq!(engine.flush_threshold(), 1);
    engine.put(b"trigger", b"x")?;

    assert_eq!(engine.run_count(), 1);
    assert_eq!(count_sst_files(&db), 1);
    assert_eq!(engine.get(b"k")?, Some(b"buffered".to_vec()));
    Ok(())
}

#[test]
fn flush_transparency_under_tiny_threshold() -> Result<()> {
    // With a threshold this small every write flushes, so the same history
    // produces one run per operation — and identical observable state to a
    // memtable-only engine.
    let dir = tempdir()?;
    let mut flushy = Engine::open(dir.path().join("flushy"), 10)?;
    let mut memory = Engine::open(dir.path().join("memory"), BIG_THRESHOLD)?;

    let history: [(&[u8], Option<&[u8]>); 7] = [
        (b"a", Some(b"1")),
        (b"shared", Some(b"from1")),
        (b"a", None),
        (b"shared", Some(b"from2")),
        (b"b", Some(b"2")),
        (b"shared", Some(b"from_mem")),
        (b"b", None),
    ];
    for (key, op) in history {
        match op {
            Some(value) => {
                flushy.put(key, value)?;
                memory.put(key, value)?;
            }
            None => {
                flushy.delete(key)?;
                memory.delete(key)?;
            }
        }
    }
    assert!(flushy.run_count() >= 7);
    assert_eq!(memory.run_count(), 0);

    for key in [b"a" as &[u8], b"b", b"shared", b"absent"] {
        assert_eq!(flushy.get(key)?, memory.get(key)?, "key {key:?}");
    }
    assert_eq!(flushy.get(b"shared")?, Some(b"from_mem".to_vec()));
    Ok(())
}

#[test]
fn random_histories_obey_last_write_wins() -> Result<()> {
    use std::collections::BTreeMap;

    let dir = tempdir()?;
    // threshold low enough to force frequent flushes mid-history
    let mut engine = Engine::open(dir.path().join("db"), 600)?;
    let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    // deterministic xorshift so the test is reproducible
    let mut state = 0x9e37_79b9_u64;
    let mut rng = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for _ in 0..500 {
        let key = format!("key{:02}", rng() % 24).into_bytes();
        if rng() % 4 == 0 {
            engine.delete(&key)?;
            model.remove(&key);
        } else {
            let value = format!("value-{}", rng() % 1000).into_bytes();
            engine.put(&key, &value)?;
            model.insert(key, value);
        }
    }
    assert!(engine.run_count() > 0, "history should have crossed the threshold");

    for i in 0..24u64 {
        let key = format!("key{i:02}").into_bytes();
        assert_eq!(engine.get(&key)?, model.get(&key).cloned(), "key {i}");
    }
    Ok(())
}
