//! Bump-pointer arena
//!
//! An [`Arena`] owns one aligned block and serves typed regions from it by
//! advancing a single cursor. Individual regions are never freed; the whole
//! arena is rewound with [`Arena::reset`].
//!
//! Regions borrow the arena shared and `reset` borrows it exclusively, so a
//! region can never be used after the arena was rewound.
//!
//! # Examples
//! ```
//! use senkaid_memory::allocator::Arena;
//!
//! let mut arena = Arena::new(1024, 64);
//! let values = arena.allocate::<f64>(10).expect("fits");
//! assert_eq!(values.as_ptr() as usize % 64, 0);
//! for slot in values.iter_mut() {
//!     slot.write(1.0);
//! }
//!
//! assert!(arena.allocate::<f64>(120).is_none());
//! arena.reset();
//! assert!(arena.allocate::<f64>(120).is_some());
//! ```

use core::mem::MaybeUninit;
use core::slice;

use bytemuck::Zeroable;
use tracing::{debug, error, trace, warn};

use super::bump::{BumpRegion, Extent, ReserveFailure};
use super::config::ArenaConfig;
use crate::core::block::AlignedBlock;
use crate::core::traits::{MemoryUsage, Resettable};
use crate::error::MemoryResult;

/// Single-block bump allocator
///
/// `Arena` is `Send` but not `Sync`: hand it to another thread, but do not
/// share it.
#[derive(Debug)]
pub struct Arena {
    region: BumpRegion,
}

impl Arena {
    /// Create an arena of `size` bytes aligned to `alignment`
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or `alignment` is not a power of two of at
    /// least pointer size. Failure to obtain the block goes through
    /// [`std::alloc::handle_alloc_error`].
    #[track_caller]
    pub fn new(size: usize, alignment: usize) -> Self {
        Self::with_block(AlignedBlock::new(size, alignment))
    }

    /// Create an arena, returning construction failures as errors
    pub fn try_new(size: usize, alignment: usize) -> MemoryResult<Self> {
        AlignedBlock::try_new(size, alignment).map(Self::with_block)
    }

    /// Create an arena from a config
    pub fn from_config(config: &ArenaConfig) -> MemoryResult<Self> {
        config.validate()?;
        Self::try_new(config.size, config.alignment)
    }

    fn with_block(block: AlignedBlock) -> Self {
        debug!(
            target: "senkaid_memory::arena",
            size = block.len(),
            align = block.alignment(),
            "arena created"
        );
        Self {
            region: BumpRegion::new(block),
        }
    }

    fn reserve<T>(&self, count: usize) -> Option<Extent<T>> {
        match self.region.reserve::<T>(count) {
            Ok(extent) => {
                trace!(
                    target: "senkaid_memory::arena",
                    offset = extent.start,
                    bytes = extent.end - extent.start,
                    align = extent.align,
                    "arena allocation"
                );
                Some(extent)
            }
            Err(ReserveFailure::ZeroCount) => {
                warn!(target: "senkaid_memory::arena", "zero-length allocation request");
                None
            }
            Err(ReserveFailure::Overflow) => {
                warn!(
                    target: "senkaid_memory::arena",
                    count,
                    elem_size = size_of::<T>(),
                    "allocation size overflows"
                );
                None
            }
            Err(ReserveFailure::OutOfSpace {
                requested,
                available,
            }) => {
                error!(
                    target: "senkaid_memory::arena",
                    requested,
                    available,
                    align = align_of::<T>().max(self.alignment()),
                    "insufficient arena space"
                );
                None
            }
        }
    }

    /// Allocate room for `count` values of `T`
    ///
    /// The region is aligned to `max(align_of::<T>(), self.alignment())` and
    /// left uninitialized. Returns `None` (and leaves the arena unchanged) if
    /// `count` is zero, the byte size overflows, or the region does not fit.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate<T>(&self, count: usize) -> Option<&mut [MaybeUninit<T>]> {
        let extent = self.reserve::<T>(count)?;
        // SAFETY: the extent is a fresh, suitably aligned range inside the
        // block that no other live region overlaps. It stays valid until
        // `reset(&mut self)` or drop, neither of which can run while the
        // returned borrow of `self` is alive.
        Some(unsafe { slice::from_raw_parts_mut(extent.ptr.as_ptr().cast(), count) })
    }

    /// Allocate room for `count` zero-initialized values of `T`
    #[allow(clippy::mut_from_ref)]
    pub fn allocate_zeroed<T: Zeroable>(&self, count: usize) -> Option<&mut [T]> {
        let extent = self.reserve::<T>(count)?;
        // SAFETY: as in `allocate`; the range is zeroed before the typed slice
        // is formed, and all-zero is a valid `T` by the `Zeroable` bound.
        unsafe {
            extent.ptr.as_ptr().write_bytes(0, count);
            Some(slice::from_raw_parts_mut(extent.ptr.as_ptr(), count))
        }
    }

    /// Rewind the cursor to the start of the block
    ///
    /// Values stored in the arena are not dropped.
    pub fn reset(&mut self) {
        debug!(
            target: "senkaid_memory::arena",
            released = self.used(),
            "arena reset"
        );
        self.region.reset();
    }

    /// Bytes consumed so far, alignment padding included
    #[inline]
    pub fn used(&self) -> usize {
        self.region.used()
    }

    /// Bytes left after the cursor
    #[inline]
    pub fn remaining(&self) -> usize {
        self.region.remaining()
    }

    /// Size of the backing block
    #[inline]
    pub fn capacity(&self) -> usize {
        self.region.block().len()
    }

    /// Alignment of the backing block
    #[inline]
    pub fn alignment(&self) -> usize {
        self.region.block().alignment()
    }

    /// Whether `ptr` points into the backing block
    pub fn contains<T>(&self, ptr: *const T) -> bool {
        self.region.block().contains(ptr)
    }
}

impl MemoryUsage for Arena {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> usize {
        self.remaining()
    }
}

impl Resettable for Arena {
    fn reset(&mut self) {
        Self::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_new() {
        let arena = Arena::new(1024, 64);
        assert_eq!(arena.capacity(), 1024);
        assert_eq!(arena.alignment(), 64);
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.remaining(), 1024);
    }

    #[test]
    fn test_arena_allocation_alignment() {
        let arena = Arena::new(1024, 64);
        let a = arena.allocate::<u8>(1).expect("fits");
        let b = arena.allocate::<u8>(1).expect("fits");
        assert_eq!(a.as_ptr() as usize % 64, 0);
        assert_eq!(b.as_ptr() as usize % 64, 0);
        assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 64);
        assert_eq!(arena.used(), 65);
    }

    #[test]
    fn test_arena_zeroed() {
        let arena = Arena::new(256, 16);
        let dirty = arena.allocate::<u8>(16).expect("fits");
        for slot in dirty.iter_mut() {
            slot.write(0xFF);
        }
        let clean = arena.allocate_zeroed::<u32>(8).expect("fits");
        assert!(clean.iter().all(|&v| v == 0));
        clean[3] = 7;
        assert_eq!(clean[3], 7);
    }

    #[test]
    fn test_arena_rejects_zero_count() {
        let arena = Arena::new(64, 8);
        assert!(arena.allocate::<u32>(0).is_none());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_arena_contains() {
        let arena = Arena::new(128, 16);
        let region = arena.allocate::<u16>(4).expect("fits");
        assert!(arena.contains(region.as_ptr()));
        let outside = 0u16;
        assert!(!arena.contains(&raw const outside));
    }

    #[test]
    fn test_arena_usage_trait() {
        let arena = Arena::new(100, 8);
        arena.allocate::<u8>(25).expect("fits");
        assert_eq!(arena.used_memory(), 25);
        assert_eq!(arena.available_memory(), 75);
        assert_eq!(arena.total_memory(), 100);
    }
}
