//! Byte-level helpers and alignment arithmetic
//!
//! This module provides the helpers shared by the allocators:
//! - Alignment predicates and arithmetic
//! - Zero / fill / copy over byte and `Pod` slices
//!
//! Null arguments are unrepresentable for the slice helpers. The only entry
//! point taking a raw pointer is [`is_aligned_ptr`].

use bytemuck::{Pod, Zeroable};
use tracing::warn;

use crate::core::types::alignment::MIN_ALIGN;
use crate::error::{MemoryError, MemoryResult};

/// Checks whether `alignment` is acceptable for an allocator block
///
/// Valid alignments are powers of two no smaller than a pointer.
///
/// # Examples
/// ```
/// use senkaid_memory::utils::is_valid_alignment;
///
/// assert!(is_valid_alignment(16));
/// assert!(!is_valid_alignment(24));
/// assert!(!is_valid_alignment(0));
/// ```
#[inline]
pub const fn is_valid_alignment(alignment: usize) -> bool {
    alignment.is_power_of_two() && alignment >= MIN_ALIGN
}

/// Aligns a value up to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use senkaid_memory::utils::align_up;
///
/// assert_eq!(align_up(7, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Aligns a value down to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use senkaid_memory::utils::align_down;
///
/// assert_eq!(align_down(7, 8), 0);
/// assert_eq!(align_down(9, 8), 8);
/// ```
#[inline(always)]
pub const fn align_down(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    value & !(alignment - 1)
}

/// Checks if a value is aligned to the given alignment
#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Calculates padding needed to align a value
///
/// # Examples
/// ```
/// use senkaid_memory::utils::padding_needed;
///
/// assert_eq!(padding_needed(7, 8), 1);
/// assert_eq!(padding_needed(8, 8), 0);
/// ```
#[inline(always)]
pub const fn padding_needed(value: usize, alignment: usize) -> usize {
    align_up(value, alignment) - value
}

/// Checks a raw pointer against an alignment
///
/// Returns `false` and logs a warning for a null pointer or an alignment
/// that is not a power of two.
pub fn is_aligned_ptr<T>(ptr: *const T, alignment: usize) -> bool {
    if ptr.is_null() {
        warn!(target: "senkaid_memory::utils", "alignment check on null pointer");
        return false;
    }
    if !alignment.is_power_of_two() {
        warn!(
            target: "senkaid_memory::utils",
            align = alignment,
            "alignment check with non power-of-two alignment"
        );
        return false;
    }
    is_aligned(ptr as usize, alignment)
}

/// Finds the first address at or after `addr` aligned to `alignment` such
/// that `size` bytes starting there still fit in the `space` bytes that begin
/// at `addr`
///
/// Returns the aligned address, or `None` if it does not fit or the
/// arithmetic overflows.
///
/// # Examples
/// ```
/// use senkaid_memory::utils::align_offset;
///
/// assert_eq!(align_offset(0x1001, 16, 8, 64), Some(0x1010));
/// assert_eq!(align_offset(0x1001, 16, 60, 64), None);
/// ```
pub fn align_offset(addr: usize, alignment: usize, size: usize, space: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    let aligned = addr.checked_add(alignment - 1)? & !(alignment - 1);
    let padding = aligned - addr;
    let needed = padding.checked_add(size)?;
    (needed <= space).then_some(aligned)
}

/// Zero every byte of `bytes`
#[inline]
pub fn zero_memory(bytes: &mut [u8]) {
    bytes.fill(0);
}

/// Fill every byte of `bytes` with `value`
#[inline]
pub fn fill_memory(bytes: &mut [u8], value: u8) {
    bytes.fill(value);
}

/// Copy `src` into `dst`
///
/// The ranges cannot overlap (borrowing rules forbid it) and must have equal
/// length.
pub fn copy_memory(dst: &mut [u8], src: &[u8]) -> MemoryResult<()> {
    if dst.len() != src.len() {
        warn!(
            target: "senkaid_memory::utils",
            dst = dst.len(),
            src = src.len(),
            "copy with mismatched lengths"
        );
        return Err(MemoryError::LengthMismatch {
            dst: dst.len(),
            src: src.len(),
        });
    }
    dst.copy_from_slice(src);
    Ok(())
}

/// Zero a typed slice whose all-zero bit pattern is a valid value
#[inline]
pub fn zero_slice<T: Zeroable>(slice: &mut [T]) {
    bytemuck::fill_zeroes(slice);
}

/// Copy a typed slice byte-for-byte
pub fn copy_slice<T: Pod>(dst: &mut [T], src: &[T]) -> MemoryResult<()> {
    copy_memory(bytemuck::cast_slice_mut(dst), bytemuck::cast_slice(src))
}
