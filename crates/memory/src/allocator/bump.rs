//! Bump region shared by [`Arena`](super::Arena) and
//! [`FallbackAllocator`](super::FallbackAllocator)
//!
//! A `BumpRegion` is one [`AlignedBlock`] plus a cell-based cursor. It hands
//! out disjoint byte extents and knows nothing about logging or handles;
//! the allocators wrap it with their own policy.
//!
//! ## Invariants
//!
//! - `offset <= block.len()` at all times
//! - every extent returned by `reserve` lies in `[0, offset)` at the moment it
//!   is returned, and no two live extents overlap

use core::cell::Cell;
use core::ptr::NonNull;

use crate::core::block::AlignedBlock;
use crate::utils::align_offset;

/// Why a reservation could not be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReserveFailure {
    /// `count == 0`
    ZeroCount,
    /// `count * size_of::<T>()` overflowed
    Overflow,
    /// Not enough space left after alignment padding
    OutOfSpace { requested: usize, available: usize },
}

/// A reserved byte extent, relative to the block base
#[derive(Debug)]
pub(crate) struct Extent<T> {
    pub ptr: NonNull<T>,
    /// Cursor position before the reservation (padding included)
    pub mark: usize,
    /// First byte of the typed region
    pub start: usize,
    /// One past the last byte of the typed region
    pub end: usize,
    /// Alignment the region was placed at
    pub align: usize,
}

pub(crate) struct BumpRegion {
    block: AlignedBlock,
    offset: Cell<usize>,
}

impl BumpRegion {
    pub fn new(block: AlignedBlock) -> Self {
        Self {
            block,
            offset: Cell::new(0),
        }
    }

    #[inline]
    pub fn block(&self) -> &AlignedBlock {
        &self.block
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.offset.get()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.block.len() - self.offset.get()
    }

    /// Reserve room for `count` values of `T`
    ///
    /// The region is aligned to `max(align_of::<T>(), block alignment)`. The
    /// cursor only moves on success.
    pub fn reserve<T>(&self, count: usize) -> Result<Extent<T>, ReserveFailure> {
        if count == 0 {
            return Err(ReserveFailure::ZeroCount);
        }
        let bytes = size_of::<T>()
            .checked_mul(count)
            .ok_or(ReserveFailure::Overflow)?;
        let align = align_of::<T>().max(self.block.alignment());

        let mark = self.offset.get();
        let space = self.block.len() - mark;
        let cursor = self.block.addr() + mark;

        let aligned = align_offset(cursor, align, bytes, space).ok_or(
            ReserveFailure::OutOfSpace {
                requested: bytes,
                available: space,
            },
        )?;
        let start = aligned - self.block.addr();
        let end = start + bytes;
        self.offset.set(end);

        // SAFETY: align_offset guarantees start + bytes <= block.len(), so the
        // offset stays inside (or one past) the owned allocation.
        let ptr = unsafe { self.block.as_non_null().add(start) }.cast::<T>();
        Ok(Extent {
            ptr,
            mark,
            start,
            end,
            align,
        })
    }

    /// Move the cursor back to `mark` if `end` is the current cursor
    ///
    /// Returns whether the cursor moved.
    pub fn rollback(&self, mark: usize, end: usize) -> bool {
        if end == self.offset.get() && mark <= end {
            self.offset.set(mark);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.offset.set(0);
    }
}

impl core::fmt::Debug for BumpRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BumpRegion")
            .field("capacity", &self.block.len())
            .field("alignment", &self.block.alignment())
            .field("used", &self.offset.get())
            .finish()
    }
}
