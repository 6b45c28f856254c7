//! Linear allocator with top-of-stack release
//!
//! [`FallbackAllocator`] places regions exactly like [`Arena`](super::Arena)
//! but zero-fills every region and hands it out as a [`FallbackSlice`].
//! Passing a slice back to [`FallbackAllocator::deallocate`] reclaims its
//! space only when it is the most recent live allocation; any other release
//! is accepted and the space stays consumed until [`FallbackAllocator::reset`].
//!
//! # Examples
//! ```
//! use senkaid_memory::allocator::{FallbackAllocator, Reclaim};
//!
//! let alloc = FallbackAllocator::new(256, 16);
//! let a = alloc.allocate::<u32>(4).expect("fits");
//! let b = alloc.allocate::<u32>(4).expect("fits");
//! assert!(b.iter().all(|&v| v == 0));
//!
//! // `a` is not on top: space is kept.
//! assert_eq!(alloc.deallocate(a).unwrap(), Reclaim::Retained);
//! assert_eq!(alloc.deallocate(b).unwrap(), Reclaim::Reclaimed);
//! ```

use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use core::slice;

use bytemuck::Zeroable;
use tracing::{debug, error, trace, warn};

use super::bump::{BumpRegion, ReserveFailure};
use super::config::ArenaConfig;
use crate::core::block::AlignedBlock;
use crate::core::traits::{MemoryUsage, Resettable};
use crate::error::{MemoryError, MemoryResult};

/// Outcome of [`FallbackAllocator::deallocate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reclaim {
    /// The slice was on top; the cursor moved back
    Reclaimed,
    /// The slice was not on top; its space stays consumed until reset
    Retained,
}

/// Zero-initialized region handed out by a [`FallbackAllocator`]
///
/// Dropping the slice without passing it to
/// [`deallocate`](FallbackAllocator::deallocate) simply leaves its space
/// consumed.
pub struct FallbackSlice<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    mark: usize,
    end: usize,
    _marker: PhantomData<&'a mut [T]>,
}

impl<T> FallbackSlice<'_, T> {
    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: zero-length requests are refused
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the region in bytes
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len * size_of::<T>()
    }
}

impl<T> Deref for FallbackSlice<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: ptr/len describe a zero-initialized region exclusively owned
        // by this handle for 'a; T: Zeroable was required to create it.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> DerefMut for FallbackSlice<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: see Deref; &mut self gives exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: fmt::Debug> fmt::Debug for FallbackSlice<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Bump allocator that can give back its most recent allocation
///
/// `Send` but not `Sync`.
#[derive(Debug)]
pub struct FallbackAllocator {
    region: BumpRegion,
}

impl FallbackAllocator {
    /// Create an allocator of `size` bytes aligned to `alignment`
    ///
    /// # Panics
    ///
    /// Panics on zero `size` or an invalid `alignment`.
    #[track_caller]
    pub fn new(size: usize, alignment: usize) -> Self {
        Self::with_block(AlignedBlock::new(size, alignment))
    }

    /// Create an allocator, returning construction failures as errors
    pub fn try_new(size: usize, alignment: usize) -> MemoryResult<Self> {
        AlignedBlock::try_new(size, alignment).map(Self::with_block)
    }

    /// Create an allocator from a config
    pub fn from_config(config: &ArenaConfig) -> MemoryResult<Self> {
        config.validate()?;
        Self::try_new(config.size, config.alignment)
    }

    fn with_block(block: AlignedBlock) -> Self {
        debug!(
            target: "senkaid_memory::fallback",
            size = block.len(),
            align = block.alignment(),
            "fallback allocator created"
        );
        Self {
            region: BumpRegion::new(block),
        }
    }

    /// Allocate `count` zero-initialized values of `T`
    ///
    /// Returns `None` if `count` is zero, the byte size overflows, or the
    /// region does not fit in the remaining space.
    pub fn allocate<T: Zeroable>(&self, count: usize) -> Option<FallbackSlice<'_, T>> {
        let extent = match self.region.reserve::<T>(count) {
            Ok(extent) => extent,
            Err(ReserveFailure::ZeroCount) => {
                warn!(target: "senkaid_memory::fallback", "zero-length allocation request");
                return None;
            }
            Err(ReserveFailure::Overflow) => {
                warn!(
                    target: "senkaid_memory::fallback",
                    count,
                    elem_size = size_of::<T>(),
                    "allocation size overflows"
                );
                return None;
            }
            Err(ReserveFailure::OutOfSpace {
                requested,
                available,
            }) => {
                error!(
                    target: "senkaid_memory::fallback",
                    requested,
                    available,
                    "insufficient fallback allocator space"
                );
                return None;
            }
        };

        // SAFETY: the extent is a fresh in-bounds range of `count` values.
        unsafe { extent.ptr.as_ptr().write_bytes(0, count) };
        trace!(
            target: "senkaid_memory::fallback",
            offset = extent.start,
            bytes = extent.end - extent.start,
            "fallback allocation"
        );

        Some(FallbackSlice {
            ptr: extent.ptr,
            len: count,
            mark: extent.mark,
            end: extent.end,
            _marker: PhantomData,
        })
    }

    /// Give a slice back
    ///
    /// Reclaims the space if the slice is the most recent live allocation,
    /// otherwise leaves state unchanged. A slice from another allocator is
    /// rejected with [`MemoryError::ForeignPointer`].
    pub fn deallocate<T>(&self, slice: FallbackSlice<'_, T>) -> MemoryResult<Reclaim> {
        let ptr = slice.ptr.as_ptr().cast_const();
        let block = self.region.block();
        if !block.contains_range(ptr, slice.byte_len())
            || block.addr() + slice.end != ptr as usize + slice.byte_len()
        {
            let err = MemoryError::foreign_pointer("fallback", ptr);
            invariant_violation!(target: "senkaid_memory::fallback", err);
            return Err(err);
        }

        if self.region.rollback(slice.mark, slice.end) {
            trace!(
                target: "senkaid_memory::fallback",
                offset = slice.mark,
                "reclaimed top allocation"
            );
            Ok(Reclaim::Reclaimed)
        } else {
            warn!(
                target: "senkaid_memory::fallback",
                addr = ptr as usize,
                bytes = slice.byte_len(),
                "release of non-top allocation; space retained until reset"
            );
            Ok(Reclaim::Retained)
        }
    }

    /// Rewind the cursor to the start of the block
    pub fn reset(&mut self) {
        debug!(
            target: "senkaid_memory::fallback",
            released = self.used(),
            "fallback allocator reset"
        );
        self.region.reset();
    }

    /// Bytes consumed so far
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

impl MemoryUsage for FallbackAllocator {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> usize {
        self.remaining()
    }
}

impl Resettable for FallbackAllocator {
    fn reset(&mut self) {
        Self::reset(self);
    }
}
