//! Fixed-size block pool
//!
//! A [`MemoryPool`] owns one aligned buffer split into `total_blocks` slots
//! of `block_size` bytes. Free slots are tracked by index: a LIFO stack of
//! free indices plus one liveness flag per slot, so every deallocation can be
//! checked for bounds, stride and double release before anything changes.
//!
//! # Examples
//! ```
//! use senkaid_memory::allocator::MemoryPool;
//!
//! let pool = MemoryPool::new(64, 4, 16);
//! let block = pool.allocate::<u64>(8).expect("8 * 8 bytes fit one block");
//! assert!(pool.allocate::<u64>(9).is_none());
//! assert_eq!(pool.available_blocks(), 3);
//!
//! pool.deallocate(block).unwrap();
//! assert_eq!(pool.available_blocks(), 4);
//! ```

use core::cell::RefCell;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use core::slice;

use tracing::{debug, trace, warn};

use super::config::PoolConfig;
use crate::core::block::AlignedBlock;
use crate::core::traits::{MemoryUsage, Resettable};
use crate::error::{MemoryError, MemoryResult};

/// One slot handed out by a [`MemoryPool`]
///
/// The slot is uninitialized. Dropping the handle without passing it to
/// [`MemoryPool::deallocate`] keeps the slot in use until
/// [`MemoryPool::reset`].
#[must_use = "a pool block is only returned to the pool by `MemoryPool::deallocate`"]
pub struct PoolBlock<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<&'a mut [MaybeUninit<T>]>,
}

impl<T> PoolBlock<'_, T> {
    /// Number of elements requested
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: zero-length requests are refused
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start of the slot
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Start of the slot
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    fn byte_len(&self) -> usize {
        self.len * size_of::<T>()
    }
}

impl<T> Deref for PoolBlock<'_, T> {
    type Target = [MaybeUninit<T>];

    fn deref(&self) -> &[MaybeUninit<T>] {
        // SAFETY: ptr/len describe a slot exclusively owned by this handle.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr().cast(), self.len) }
    }
}

impl<T> DerefMut for PoolBlock<'_, T> {
    fn deref_mut(&mut self) -> &mut [MaybeUninit<T>] {
        // SAFETY: see Deref; &mut self gives exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.len) }
    }
}

impl<T> core::fmt::Debug for PoolBlock<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PoolBlock")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Index-based free list
#[derive(Debug)]
struct FreeList {
    /// Free slot indices, next allocation pops from the end
    stack: Vec<usize>,
    /// Per-slot liveness
    in_use: Vec<bool>,
}

impl FreeList {
    fn new(total_blocks: usize) -> Self {
        Self {
            stack: (0..total_blocks).rev().collect(),
            in_use: vec![false; total_blocks],
        }
    }

    fn reset(&mut self) {
        let total = self.in_use.len();
        self.stack.clear();
        self.stack.extend((0..total).rev());
        self.in_use.fill(false);
    }
}

/// Fixed-size block allocator
///
/// `Send` but not `Sync`.
#[derive(Debug)]
pub struct MemoryPool {
    block: AlignedBlock,
    block_size: usize,
    total_blocks: usize,
    free: RefCell<FreeList>,
}

impl MemoryPool {
    /// Create a pool of `num_blocks` blocks of `block_size` bytes
    ///
    /// # Panics
    ///
    /// Panics if either count is zero, the total size overflows, or
    /// `alignment` is invalid.
    #[track_caller]
    pub fn new(block_size: usize, num_blocks: usize, alignment: usize) -> Self {
        let config = PoolConfig::new(block_size, num_blocks).with_alignment(alignment);
        if let Err(err) = config.validate() {
            panic!("MemoryPool: {err}");
        }
        // validate() checked the product
        let total = block_size * num_blocks;
        Self::with_block(AlignedBlock::new(total, alignment), block_size, num_blocks)
    }

    /// Create a pool, returning construction failures as errors
    pub fn try_new(block_size: usize, num_blocks: usize, alignment: usize) -> MemoryResult<Self> {
        Self::from_config(&PoolConfig::new(block_size, num_blocks).with_alignment(alignment))
    }

    /// Create a pool from a config
    pub fn from_config(config: &PoolConfig) -> MemoryResult<Self> {
        config.validate()?;
        let total = config
            .total_size()
            .ok_or_else(|| MemoryError::size_overflow("pool block_size * num_blocks"))?;
        let block = AlignedBlock::try_new(total, config.alignment)?;
        Ok(Self::with_block(block, config.block_size, config.num_blocks))
    }

    fn with_block(block: AlignedBlock, block_size: usize, total_blocks: usize) -> Self {
        debug!(
            target: "senkaid_memory::pool",
            block_size,
            total_blocks,
            align = block.alignment(),
            "memory pool created"
        );
        Self {
            block,
            block_size,
            total_blocks,
            free: RefCell::new(FreeList::new(total_blocks)),
        }
    }

    /// Alignment every slot is guaranteed to have
    #[inline]
    fn slot_alignment(&self) -> usize {
        let stride_align = 1usize << self.block_size.trailing_zeros();
        stride_align.min(self.block.alignment())
    }

    /// Take one block for `count` values of `T`
    ///
    /// Returns `None` if the request is empty, larger than a block, needs
    /// more alignment than the slots have, or the pool is exhausted.
    pub fn allocate<T>(&self, count: usize) -> Option<PoolBlock<'_, T>> {
        if count == 0 {
            warn!(target: "senkaid_memory::pool", "zero-length allocation request");
            return None;
        }
        let requested = match size_of::<T>().checked_mul(count) {
            Some(bytes) if bytes <= self.block_size => bytes,
            _ => {
                warn!(
                    target: "senkaid_memory::pool",
                    count,
                    elem_size = size_of::<T>(),
                    block_size = self.block_size,
                    "request exceeds pool block size"
                );
                return None;
            }
        };
        if align_of::<T>() > self.slot_alignment() {
            warn!(
                target: "senkaid_memory::pool",
                align = align_of::<T>(),
                slot_align = self.slot_alignment(),
                "request needs more alignment than pool slots provide"
            );
            return None;
        }

        let mut free = self.free.borrow_mut();
        let Some(index) = free.stack.pop() else {
            warn!(
                target: "senkaid_memory::pool",
                total_blocks = self.total_blocks,
                "memory pool exhausted"
            );
            return None;
        };
        free.in_use[index] = true;
        drop(free);

        trace!(
            target: "senkaid_memory::pool",
            index,
            requested,
            "pool allocation"
        );

        // SAFETY: index < total_blocks, so the slot lies inside the block.
        let ptr = unsafe { self.block.as_non_null().add(index * self.block_size) }.cast::<T>();
        Some(PoolBlock {
            ptr,
            len: count,
            _marker: PhantomData,
        })
    }

    /// Return a block to the pool
    ///
    /// Validation happens before any state changes:
    /// - more bytes than a block holds: [`MemoryError::ExceedsBlockSize`]
    /// - not on a slot boundary of this pool: [`MemoryError::ForeignPointer`]
    /// - slot already free: [`MemoryError::DoubleFree`]
    pub fn deallocate<T>(&self, block: PoolBlock<'_, T>) -> MemoryResult<()> {
        let ptr = block.as_ptr();
        let index = self.slot_index(ptr, block.byte_len())?;

        let mut free = self.free.borrow_mut();
        if !free.in_use[index] {
            drop(free);
            let err = MemoryError::double_free("pool", ptr);
            invariant_violation!(target: "senkaid_memory::pool", err);
            return Err(err);
        }
        free.in_use[index] = false;
        free.stack.push(index);
        drop(free);

        trace!(target: "senkaid_memory::pool", index, "pool deallocation");
        Ok(())
    }

    fn slot_index<T>(&self, ptr: *const T, bytes: usize) -> MemoryResult<usize> {
        if bytes > self.block_size {
            let err = MemoryError::ExceedsBlockSize {
                component: "pool",
                requested: bytes,
                block_size: self.block_size,
            };
            invariant_violation!(target: "senkaid_memory::pool", err);
            return Err(err);
        }

        let addr = ptr as usize;
        let base = self.block.addr();
        let index = addr
            .checked_sub(base)
            .filter(|offset| offset.is_multiple_of(self.block_size))
            .map(|offset| offset / self.block_size)
            .filter(|&index| index < self.total_blocks);

        index.ok_or_else(|| {
            let err = MemoryError::foreign_pointer("pool", ptr);
            invariant_violation!(target: "senkaid_memory::pool", err);
            err
        })
    }

    /// Return every slot to the free list
    pub fn reset(&mut self) {
        debug!(
            target: "senkaid_memory::pool",
            released = self.total_blocks - self.available_blocks(),
            "memory pool reset"
        );
        self.free.get_mut().reset();
    }

    /// Number of free slots
    pub fn available_blocks(&self) -> usize {
        self.free.borrow().stack.len()
    }

    /// Number of slots
    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    /// Size of one slot in bytes
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Alignment of the backing buffer
    #[inline]
    pub fn alignment(&self) -> usize {
        self.block.alignment()
    }

    /// Whether `ptr` points into the backing buffer
    pub fn contains<T>(&self, ptr: *const T) -> bool {
        self.block.contains(ptr)
    }
}

impl MemoryUsage for MemoryPool {
    fn used_memory(&self) -> usize {
        (self.total_blocks - self.available_blocks()) * self.block_size
    }

    fn available_memory(&self) -> usize {
        self.available_blocks() * self.block_size
    }
}

impl Resettable for MemoryPool {
    fn reset(&mut self) {
        Self::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_geometry() {
        let pool = MemoryPool::new(64, 4, 16);
        assert_eq!(pool.block_size(), 64);
        assert_eq!(pool.total_blocks(), 4);
        assert_eq!(pool.available_blocks(), 4);
        assert_eq!(pool.alignment(), 16);
        assert_eq!(pool.total_memory(), 256);
    }

    #[test]
    fn test_slots_are_strided() {
        let pool = MemoryPool::new(48, 3, 16);
        let a = pool.allocate::<u8>(1).expect("free slot");
        let b = pool.allocate::<u8>(1).expect("free slot");
        assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 48);
        assert!(pool.contains(a.as_ptr()));
        assert!(pool.contains(b.as_ptr()));
    }

    #[allow(dead_code)]
    #[repr(align(16))]
    struct Wide([u8; 16]);

    #[test]
    fn test_slot_alignment_limits_types() {
        // 24-byte stride only guarantees 8-byte alignment
        let pool = MemoryPool::new(24, 4, 64);
        assert!(pool.allocate::<Wide>(1).is_none());
        assert!(pool.allocate::<u64>(3).is_some());

        let wide = MemoryPool::new(32, 4, 64);
        assert!(wide.allocate::<Wide>(2).is_some());
    }

    #[test]
    fn test_lifo_reuse() {
        let pool = MemoryPool::new(32, 4, 8);
        let a = pool.allocate::<u32>(1).expect("free slot");
        let addr = a.as_ptr() as usize;
        pool.deallocate(a).expect("owned block");
        let b = pool.allocate::<u32>(1).expect("free slot");
        assert_eq!(b.as_ptr() as usize, addr);
    }

    #[cfg(not(feature = "strict-asserts"))]
    #[test]
    fn test_double_free_detected() {
        let pool = MemoryPool::new(32, 2, 8);
        let block = pool.allocate::<u32>(2).expect("free slot");
        let forged = PoolBlock::<u32> {
            ptr: block.ptr,
            len: block.len,
            _marker: PhantomData,
        };
        pool.deallocate(block).expect("owned block");

        let available = pool.available_blocks();
        let err = pool.deallocate(forged).unwrap_err();
        assert!(matches!(err, MemoryError::DoubleFree { component: "pool", .. }));
        assert_eq!(pool.available_blocks(), available);
    }

    #[cfg(not(feature = "strict-asserts"))]
    #[test]
    fn test_misaligned_pointer_rejected() {
        let pool = MemoryPool::new(32, 2, 8);
        let block = pool.allocate::<u8>(4).expect("free slot");
        // SAFETY: stays inside the first slot.
        let inner = unsafe { block.ptr.add(1) };
        let forged = PoolBlock::<u8> {
            ptr: inner,
            len: 1,
            _marker: PhantomData,
        };
        let err = pool.deallocate(forged).unwrap_err();
        assert!(matches!(err, MemoryError::ForeignPointer { .. }));
        assert_eq!(pool.available_blocks(), 1);
        pool.deallocate(block).expect("owned block");
    }

    #[cfg(not(feature = "strict-asserts"))]
    #[test]
    fn test_slot_past_last_block_rejected() {
        let pool = MemoryPool::new(32, 2, 8);
        let _a = pool.allocate::<u8>(1).expect("free slot");
        let _b = pool.allocate::<u8>(1).expect("free slot");

        // first slot boundary after the last real slot
        let past_end = pool
            .block
            .as_non_null()
            .as_ptr()
            .wrapping_add(pool.total_blocks() * pool.block_size());
        let forged = PoolBlock::<u8> {
            ptr: NonNull::new(past_end).expect("non-null"),
            len: 1,
            _marker: PhantomData,
        };

        let err = pool.deallocate(forged).unwrap_err();
        assert!(matches!(err, MemoryError::ForeignPointer { component: "pool", .. }));
        assert_eq!(pool.available_blocks(), 0);
    }

    #[cfg(feature = "strict-asserts")]
    #[test]
    #[should_panic(expected = "invariant violation")]
    fn test_double_free_panics_with_strict_asserts() {
        let pool = MemoryPool::new(32, 2, 8);
        let block = pool.allocate::<u32>(2).expect("free slot");
        let forged = PoolBlock::<u32> {
            ptr: block.ptr,
            len: block.len,
            _marker: PhantomData,
        };
        pool.deallocate(block).expect("owned block");
        let _ = pool.deallocate(forged);
    }

    #[test]
    fn test_reset_returns_all_slots() {
        let mut pool = MemoryPool::new(16, 3, 8);
        for _ in 0..3 {
            let _ = pool.allocate::<u8>(16).expect("free slot");
        }
        assert_eq!(pool.available_blocks(), 0);
        pool.reset();
        assert_eq!(pool.available_blocks(), 3);
        assert_eq!(pool.used_memory(), 0);
    }
}
