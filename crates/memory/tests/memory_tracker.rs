//! Memory tracker integration tests

use std::sync::Arc;
use std::thread;

use senkaid_memory::error::MemoryError;
use senkaid_memory::tracker::MemoryTracker;
use senkaid_memory::{track_alloc, track_dealloc};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[test]
fn test_alloc_then_dealloc_restores_counters() {
    init_logging();
    let tracker = MemoryTracker::new();
    let data = vec![0u8; 128];

    tracker.track_allocation(data.as_ptr(), data.len()).expect("valid request");
    assert_eq!(tracker.get_allocation_count(), 1);
    assert_eq!(tracker.get_total_allocated(), 128);

    tracker.track_deallocation(data.as_ptr()).expect("tracked");
    assert_eq!(tracker.get_allocation_count(), 0);
    assert_eq!(tracker.get_total_allocated(), 0);
}

#[cfg(not(feature = "strict-asserts"))]
#[test]
fn test_untracked_deallocation_changes_nothing() {
    init_logging();
    let tracker = MemoryTracker::new();
    let kept = [0u64; 4];
    let stray = [0u64; 2];
    tracker.track_allocation(kept.as_ptr(), 32).expect("valid request");

    let err = tracker.track_deallocation_at(stray.as_ptr(), "stray.rs", 7).unwrap_err();
    assert_eq!(
        err,
        MemoryError::UntrackedPointer {
            addr: stray.as_ptr() as usize,
            file: "stray.rs",
            line: 7,
        }
    );
    assert!(err.is_logic_error());
    assert_eq!(tracker.get_allocation_count(), 1);
    assert_eq!(tracker.get_total_allocated(), 32);
}

#[cfg(feature = "strict-asserts")]
#[test]
#[should_panic(expected = "invariant violation")]
fn test_untracked_deallocation_panics_with_strict_asserts() {
    let tracker = MemoryTracker::new();
    let stray = [0u64; 2];
    let _ = tracker.track_deallocation(stray.as_ptr());
}

#[cfg(not(feature = "strict-asserts"))]
#[test]
fn test_double_deallocation_is_rejected() {
    let tracker = MemoryTracker::new();
    let data = [1u8; 8];
    tracker.track_allocation(data.as_ptr(), 8).expect("valid request");
    tracker.track_deallocation(data.as_ptr()).expect("tracked");
    assert!(matches!(
        tracker.track_deallocation(data.as_ptr()),
        Err(MemoryError::UntrackedPointer { .. })
    ));
}

#[test]
fn test_concurrent_tracking() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 64;

    let tracker = MemoryTracker::shared();
    let buffers: Arc<Vec<Vec<u64>>> = Arc::new(
        (0..THREADS)
            .map(|_| vec![0u64; PER_THREAD])
            .collect(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let tracker = Arc::clone(&tracker);
            let buffers = Arc::clone(&buffers);
            thread::spawn(move || {
                for slot in &buffers[t] {
                    tracker
                        .track_allocation(slot as *const u64, size_of::<u64>())
                        .expect("valid request");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("tracking thread panicked");
    }

    assert_eq!(tracker.get_allocation_count(), THREADS * PER_THREAD);
    assert_eq!(
        tracker.get_total_allocated(),
        THREADS * PER_THREAD * size_of::<u64>()
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let tracker = Arc::clone(&tracker);
            let buffers = Arc::clone(&buffers);
            thread::spawn(move || {
                for slot in &buffers[t] {
                    tracker.track_deallocation(slot as *const u64).expect("tracked");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("untracking thread panicked");
    }
    assert_eq!(tracker.get_allocation_count(), 0);
    assert_eq!(tracker.get_total_allocated(), 0);
}

#[test]
fn test_leak_report_lists_call_sites() {
    init_logging();
    let tracker = MemoryTracker::new();
    let a = [0u8; 16];
    let b = [0u8; 48];
    tracker.track_allocation(a.as_ptr(), 16).expect("valid request");
    tracker.track_allocation(b.as_ptr(), 48).expect("valid request");

    let leaks = tracker.leaks();
    assert_eq!(leaks.len(), 2);
    assert!(leaks[0].addr < leaks[1].addr);
    assert!(leaks.iter().all(|leak| leak.file.ends_with("memory_tracker.rs")));
    assert_eq!(tracker.report_leaks(), 2);

    tracker.clear();
    assert_eq!(tracker.report_leaks(), 0);
}

#[test]
fn test_tracking_macros() {
    let tracker = MemoryTracker::new();
    let data = vec![0u16; 10];

    track_alloc!(tracker, data.as_ptr(), 20);
    #[cfg(feature = "tracking")]
    {
        assert_eq!(tracker.get_total_allocated(), 20);
        let leak = tracker.leaks()[0];
        assert_eq!(leak.file, file!());
    }

    track_dealloc!(tracker, data.as_ptr());
    assert_eq!(tracker.get_allocation_count(), 0);
}

#[test]
fn test_global_tracker_macros() {
    let data = Box::new([0u8; 24]);
    let global = MemoryTracker::global();

    track_alloc!(data.as_ptr(), 24);
    #[cfg(feature = "tracking")]
    assert!(global.is_tracked(data.as_ptr()));

    track_dealloc!(data.as_ptr());
    assert!(!global.is_tracked(data.as_ptr()));
}
