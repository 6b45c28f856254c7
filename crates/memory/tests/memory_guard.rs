//! Memory guard integration tests

use std::sync::Arc;

use senkaid_memory::error::MemoryError;
use senkaid_memory::guard::MemoryGuard;
use senkaid_memory::tracker::MemoryTracker;

struct DropCounter(Arc<std::sync::atomic::AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

fn counters(n: usize, hits: &Arc<std::sync::atomic::AtomicUsize>) -> Box<[DropCounter]> {
    (0..n).map(|_| DropCounter(Arc::clone(hits))).collect()
}

#[test]
fn test_guard_frees_exactly_once_after_take() {
    let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut source = MemoryGuard::new(counters(3, &hits));

    let owner = source.take();
    assert!(source.get().is_none());
    assert_eq!(source.count(), 0);
    assert_eq!(owner.count(), 3);

    drop(source);
    assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 0);
    drop(owner);
    assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[test]
fn test_guard_release_does_not_free() {
    let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut guard = MemoryGuard::new(counters(2, &hits));
    let data = guard.release().expect("owned");
    assert!(!guard.is_owned());
    drop(guard);
    assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 0);

    drop(data);
    assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[test]
fn test_guard_mem_take_matches_take() {
    let mut guard = MemoryGuard::new(vec![1.0f32; 8].into_boxed_slice());
    let moved = std::mem::take(&mut guard);
    assert!(!guard.is_owned());
    assert_eq!(moved.get().map(<[f32]>::len), Some(8));
}

#[test]
fn test_guard_rejects_empty() {
    let empty: Box<[f64]> = Vec::new().into_boxed_slice();
    assert_eq!(
        MemoryGuard::try_new(empty).map(|guard| guard.count()),
        Err(MemoryError::EmptyAllocation)
    );
}

#[test]
fn test_tracked_guard_reports_one_deallocation() {
    let tracker = MemoryTracker::shared();
    let mut guard =
        MemoryGuard::tracked(vec![0u32; 25].into_boxed_slice(), Arc::clone(&tracker));
    assert!(guard.is_tracked());
    assert_eq!(tracker.get_allocation_count(), 1);
    assert_eq!(tracker.get_total_allocated(), 100);

    let leaks = tracker.leaks();
    assert_eq!(leaks.len(), 1);
    assert!(leaks[0].file.ends_with("memory_guard.rs"));

    let owner = guard.take();
    assert!(!guard.is_tracked());
    drop(guard);
    assert_eq!(tracker.get_allocation_count(), 1);

    drop(owner);
    assert_eq!(tracker.get_allocation_count(), 0);
    assert_eq!(tracker.report_leaks(), 0);
}
