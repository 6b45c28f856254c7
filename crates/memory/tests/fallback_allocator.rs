//! Fallback allocator integration tests

use senkaid_memory::allocator::{ArenaConfig, FallbackAllocator, Reclaim};

#[test]
fn test_release_of_top_restores_usage() {
    let alloc = FallbackAllocator::new(1024, 16);
    let _keep = alloc.allocate::<u16>(5).expect("fits");
    let before = alloc.used();

    let x = alloc.allocate::<f64>(12).expect("fits");
    assert_eq!(alloc.deallocate(x), Ok(Reclaim::Reclaimed));
    assert_eq!(alloc.used(), before);
}

#[test]
fn test_release_out_of_order_retains_space() {
    let alloc = FallbackAllocator::new(1024, 16);
    let x = alloc.allocate::<f64>(4).expect("fits");
    let y = alloc.allocate::<f64>(4).expect("fits");
    let used = alloc.used();

    assert_eq!(alloc.deallocate(x), Ok(Reclaim::Retained));
    assert_eq!(alloc.used(), used);

    // y is still on top and can be reclaimed
    assert_eq!(alloc.deallocate(y), Ok(Reclaim::Reclaimed));
    assert!(alloc.used() < used);
}

#[test]
fn test_stack_order_release_empties_allocator() {
    let alloc = FallbackAllocator::new(2048, 16);
    let a = alloc.allocate::<u8>(7).expect("fits");
    let b = alloc.allocate::<u32>(9).expect("fits");
    let c = alloc.allocate::<f64>(3).expect("fits");

    for outcome in [alloc.deallocate(c), alloc.deallocate(b), alloc.deallocate(a)] {
        assert_eq!(outcome, Ok(Reclaim::Reclaimed));
    }
    assert_eq!(alloc.used(), 0);
}

#[test]
fn test_memory_is_zeroed() {
    let alloc = FallbackAllocator::new(256, 16);
    let mut dirty = alloc.allocate::<u32>(16).expect("fits");
    dirty.fill(0xDEAD_BEEF);
    alloc.deallocate(dirty).expect("owned slice");

    let clean = alloc.allocate::<u32>(16).expect("fits");
    assert!(clean.iter().all(|&v| v == 0));
}

#[test]
fn test_reset_and_config() {
    let mut alloc =
        FallbackAllocator::from_config(&ArenaConfig::new(512).with_alignment(32)).expect("valid");
    assert_eq!(alloc.alignment(), 32);
    let _ = alloc.allocate::<u8>(500).expect("fits");
    assert!(alloc.allocate::<u8>(100).is_none());

    alloc.reset();
    assert_eq!(alloc.remaining(), 512);
}
