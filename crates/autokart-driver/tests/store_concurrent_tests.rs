//! 指令存储并发测试
//!
//! 验证 `CommandStore` 在一写多读下不会出现撕裂读取，且序号单调。

use autokart_driver::{CommandStore, MappedCommand, RawPacket, SystemClock};
use std::sync::Arc;
use std::thread;

fn packet(i: i32) -> RawPacket {
    // 每个字段都随序号变化，混读会让 raw 与 mapped 对不上
    RawPacket::new([
        900 + (i % 1000),
        980 + (i % 25),
        985 + (i % 15),
        1800 + (i % 20),
        1805 + (i % 10),
        if i % 2 == 0 { 172 } else { 992 },
    ])
}

/// 读者看到的 `mapped` 总是由同一快照中的 `raw` 映射而来
#[test]
fn test_snapshot_is_never_torn() {
    let store = Arc::new(CommandStore::new(Arc::new(SystemClock::new())));
    let writes = 5000;
    let num_readers = 8;

    let writer_store = store.clone();
    let writer = thread::spawn(move || {
        for i in 0..writes {
            let raw = packet(i);
            writer_store.publish(raw, MappedCommand::from_raw(&raw));
            if i % 64 == 0 {
                thread::yield_now();
            }
        }
    });

    let mut readers = Vec::new();
    for _ in 0..num_readers {
        let store = store.clone();
        readers.push(thread::spawn(move || {
            let mut last_sequence = 0u64;
            loop {
                let state = store.snapshot();
                assert_eq!(state.mapped, MappedCommand::from_raw(&state.raw));
                // 序号不倒退
                assert!(state.sequence >= last_sequence);
                last_sequence = state.sequence;
                if state.sequence == writes as u64 {
                    break;
                }
            }
        }));
    }

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let last = store.snapshot();
    assert_eq!(last.sequence, writes as u64);
    assert_eq!(last.raw, packet(writes - 1));
}

/// 多个写者并发发布：序号不重复、不丢失
#[test]
fn test_concurrent_writers_keep_sequence_dense() {
    let store = Arc::new(CommandStore::new(Arc::new(SystemClock::new())));
    let num_writers = 4;
    let writes_per_writer = 1000;

    let handles: Vec<_> = (0..num_writers)
        .map(|w| {
            let store = store.clone();
            thread::spawn(move || {
                let mut sequences = Vec::with_capacity(writes_per_writer);
                for i in 0..writes_per_writer {
                    let raw = packet((w * writes_per_writer + i) as i32);
                    sequences.push(store.publish(raw, MappedCommand::from_raw(&raw)));
                }
                sequences
            })
        })
        .collect();

    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();

    let expected: Vec<u64> = (1..=(num_writers * writes_per_writer) as u64).collect();
    assert_eq!(all, expected);
}
