//! Concurrency tests
//!
//! Units from many threads share one `TallyDb`; stripe locks plus LMDB's
//! single writer must make every read-modify-write atomic.

use std::sync::{Arc, Barrier};
use std::thread;
use tally::prelude::*;

/// Concurrent increments on one member must not lose updates
#[test]
fn test_no_lost_increments_same_member() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Arc::new(TallyDb::open(temp_dir.path()).unwrap());

    let num_threads = 16;
    let increments_per_thread = 50;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                for _ in 0..increments_per_thread {
                    db.inc_score("hot", None, &[EntryInput::new("counter", 1.0)])
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let entry = db.get_by_id("hot", None, "counter").unwrap().unwrap();
    assert_eq!(entry.score, (num_threads * increments_per_thread) as f64);
}

/// Concurrent appends must hand out distinct sequence positions
#[test]
fn test_concurrent_appends_get_unique_positions() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Arc::new(TallyDb::open(temp_dir.path()).unwrap());

    let num_threads = 8;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                for i in 0..per_thread {
                    let id = format!("t{}-{}", t, i);
                    db.append("feed", None, &[EntryInput::new(id, 0.0)]).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let entries = db.get_range("feed", None, 0, -1).unwrap();
    assert_eq!(entries.len(), num_threads * per_thread);

    let mut scores: Vec<f64> = entries.iter().map(|e| e.score).collect();
    scores.dedup();
    assert_eq!(scores.len(), entries.len(), "two appends shared a position");
    assert_eq!(entries.last().unwrap().score, 1.0);
    assert_eq!(entries[0].score, (num_threads * per_thread) as f64);
}

/// Capacity must hold even when many writers race on one board
#[test]
fn test_capacity_under_contention() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Arc::new(TallyDb::open(temp_dir.path()).unwrap());
    let options = Options::new().with_capacity(10);

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            let options = options.clone();

            thread::spawn(move || {
                barrier.wait();
                for i in 0..20 {
                    let id = format!("p{}-{}", t, i);
                    db.set_score("ladder", Some(&options), &[EntryInput::new(id, (t * 100 + i) as f64)])
                        .unwrap();
                    assert!(db.len("ladder").unwrap() <= 10);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let kept = db.get_range("ladder", None, 0, -1).unwrap();
    assert_eq!(kept.len(), 10);
    assert_eq!(kept[0].id, "p7-19");
    assert_eq!(kept[9].id, "p7-10");
}

/// Independent boards written in parallel stay independent
#[test]
fn test_parallel_independent_boards() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Arc::new(TallyDb::open(temp_dir.path()).unwrap());

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                let key = format!("board{}", t);
                barrier.wait();
                for i in 0..30 {
                    db.set_score(&key, None, &[EntryInput::new(format!("m{}", i), i as f64)])
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..num_threads {
        assert_eq!(db.len(&format!("board{}", t)).unwrap(), 30);
    }
}

/// Readers never see a half-applied swap
#[test]
fn test_swaps_preserve_score_multiset() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Arc::new(TallyDb::open(temp_dir.path()).unwrap());

    let entries: Vec<EntryInput> = (0..5)
        .map(|i| EntryInput::new(format!("s{}", i), (i * 10) as f64))
        .collect();
    db.set_score("order", None, &entries).unwrap();

    let num_threads = 4;
    let barrier = Arc::new(Barrier::new(num_threads + 1));

    let writers: Vec<_> = (0..num_threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                for i in 0..25 {
                    let a = ((t + i) % 5) as i64;
                    let b = ((t + 2 * i + 1) % 5) as i64;
                    db.swap_by_rank("order", None, a, b).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let db = Arc::clone(&db);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..50 {
                let mut scores: Vec<f64> = db
                    .get_range("order", None, 0, -1)
                    .unwrap()
                    .iter()
                    .map(|e| e.score)
                    .collect();
                scores.sort_by(|a, b| a.total_cmp(b));
                assert_eq!(scores, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();
}
