//! Aligned allocation primitive and the owned block built on top of it
//!
//! # Safety
//!
//! This module is the only place that talks to the global allocator:
//! - [`aligned_alloc`] / [`aligned_alloc_zeroed`] validate size and alignment
//!   before building a `Layout`, so the unsafe `alloc` calls never see a
//!   zero-sized layout
//! - [`aligned_free`] must be handed back exactly the size/alignment pair used
//!   for the allocation
//! - [`AlignedBlock`] owns one allocation and frees it exactly once, on drop
//!
//! ## Invariants
//!
//! - `AlignedBlock::ptr` is non-null, aligned to `alignment` and valid for
//!   `len` bytes for the whole lifetime of the block
//! - `alignment` is a power of two and at least `MIN_ALIGN`

use core::alloc::Layout;
use core::ptr::NonNull;
use std::alloc;

use tracing::trace;

use crate::error::{MemoryError, MemoryResult};
use crate::utils::is_valid_alignment;

/// Validates a block request and builds its layout
fn block_layout(size: usize, alignment: usize) -> MemoryResult<Layout> {
    if !is_valid_alignment(alignment) {
        return Err(MemoryError::invalid_alignment(alignment));
    }
    if size == 0 {
        return Err(MemoryError::invalid_config("block size must be non-zero"));
    }
    Layout::from_size_align(size, alignment)
        .map_err(|_| MemoryError::size_overflow("aligned block layout"))
}

/// Allocates `size` bytes aligned to `alignment`
///
/// Returns `None` if the alignment is not a power of two of at least
/// pointer size, if `size` is zero, or if the global allocator fails.
pub fn aligned_alloc(size: usize, alignment: usize) -> Option<NonNull<u8>> {
    let layout = block_layout(size, alignment).ok()?;
    // SAFETY: block_layout rejects zero-sized layouts.
    NonNull::new(unsafe { alloc::alloc(layout) })
}

/// Like [`aligned_alloc`], with the returned memory zero-filled
pub fn aligned_alloc_zeroed(size: usize, alignment: usize) -> Option<NonNull<u8>> {
    let layout = block_layout(size, alignment).ok()?;
    // SAFETY: block_layout rejects zero-sized layouts.
    NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
}

/// Releases memory obtained from [`aligned_alloc`] or [`aligned_alloc_zeroed`]
///
/// # Safety
///
/// - `ptr` must come from one of the allocation functions in this module
/// - `size` and `alignment` must be the values passed to that call
/// - `ptr` must not be used or freed again afterwards
pub unsafe fn aligned_free(ptr: NonNull<u8>, size: usize, alignment: usize) {
    // SAFETY: caller guarantees the pair was accepted by block_layout at
    // allocation time, so it is a valid layout.
    unsafe {
        let layout = Layout::from_size_align_unchecked(size, alignment);
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// One raw, exclusively owned, aligned allocation
///
/// Every allocator in this crate owns exactly one `AlignedBlock` and carves
/// its sub-allocations out of it. The block is released when dropped.
#[derive(Debug)]
pub struct AlignedBlock {
    ptr: NonNull<u8>,
    len: usize,
    alignment: usize,
}

impl AlignedBlock {
    /// Allocates a block, treating bad arguments as fatal
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or `alignment` is not a power of two of at
    /// least pointer size. Allocation failure is reported through
    /// [`std::alloc::handle_alloc_error`].
    #[track_caller]
    pub fn new(size: usize, alignment: usize) -> Self {
        Self::allocate_or_abort(size, alignment, false)
    }

    /// Allocates a zero-filled block, treating bad arguments as fatal
    #[track_caller]
    pub fn new_zeroed(size: usize, alignment: usize) -> Self {
        Self::allocate_or_abort(size, alignment, true)
    }

    /// Allocates a block, reporting bad arguments and allocation failure
    /// as errors
    pub fn try_new(size: usize, alignment: usize) -> MemoryResult<Self> {
        Self::try_allocate(size, alignment, false)
    }

    /// Allocates a zero-filled block, reporting failures as errors
    pub fn try_new_zeroed(size: usize, alignment: usize) -> MemoryResult<Self> {
        Self::try_allocate(size, alignment, true)
    }

    #[track_caller]
    fn allocate_or_abort(size: usize, alignment: usize, zeroed: bool) -> Self {
        let layout = match block_layout(size, alignment) {
            Ok(layout) => layout,
            Err(err) => panic!("AlignedBlock: {err}"),
        };
        match Self::from_layout(layout, zeroed) {
            Some(block) => block,
            None => alloc::handle_alloc_error(layout),
        }
    }

    fn try_allocate(size: usize, alignment: usize, zeroed: bool) -> MemoryResult<Self> {
        let layout = block_layout(size, alignment)?;
        Self::from_layout(layout, zeroed)
            .ok_or_else(|| MemoryError::allocation_failed_with_layout(layout))
    }

    fn from_layout(layout: Layout, zeroed: bool) -> Option<Self> {
        // SAFETY: layouts reaching here come from block_layout (non-zero size).
        let raw = unsafe {
            if zeroed {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        };
        let ptr = NonNull::new(raw)?;
        trace!(
            target: "senkaid_memory::block",
            size = layout.size(),
            align = layout.align(),
            "acquired aligned block"
        );
        Some(Self {
            ptr,
            len: layout.size(),
            alignment: layout.align(),
        })
    }

    /// Base pointer of the block
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Base pointer of the block as `NonNull`
    #[inline]
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Base address of the block
    #[inline]
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Size of the block in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: zero-sized blocks are rejected at construction
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment of the base pointer
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Checks whether `ptr` points into `[base, base + len)`
    pub fn contains<T>(&self, ptr: *const T) -> bool {
        let addr = ptr as usize;
        addr >= self.addr() && addr - self.addr() < self.len
    }

    /// Checks whether the byte range `[ptr, ptr + bytes)` lies inside the block
    pub fn contains_range<T>(&self, ptr: *const T, bytes: usize) -> bool {
        let addr = ptr as usize;
        if addr < self.addr() {
            return false;
        }
        let offset = addr - self.addr();
        offset <= self.len && bytes <= self.len - offset
    }
}

impl Drop for AlignedBlock {
    fn drop(&mut self) {
        trace!(
            target: "senkaid_memory::block",
            size = self.len,
            align = self.alignment,
            "releasing aligned block"
        );
        // SAFETY: ptr/len/alignment are exactly what was allocated in
        // from_layout, and drop runs once.
        unsafe { aligned_free(self.ptr, self.len, self.alignment) };
    }
}

// SAFETY: AlignedBlock uniquely owns its allocation; moving it to another
// thread moves that ownership with it.
unsafe impl Send for AlignedBlock {}

// SAFETY: &AlignedBlock only exposes the base pointer value and sizes. Any
// access through the pointer is governed by the owning allocator.
unsafe impl Sync for AlignedBlock {}
