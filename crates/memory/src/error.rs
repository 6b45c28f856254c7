//! Error types for senkaid-memory
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Two classes of failure exist in this crate. Resource exhaustion (an arena
//! running out of space, an empty pool free list) is reported by the
//! allocators as `None` and never reaches this enum. Everything here is
//! either a rejected construction argument or a programming error detected
//! on a deallocation/tracking path; see [`MemoryError::is_logic_error`].

use core::alloc::Layout;
use thiserror::Error;
use tracing::error;

// ============================================================================
// Main Error Types
// ============================================================================

/// Memory management errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Construction Errors ---
    #[error("Memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    #[error("Invalid alignment: {alignment} (must be a power of two >= {min})")]
    InvalidAlignment { alignment: usize, min: usize },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    // --- Deallocation Errors ---
    #[error("{component}: {requested} bytes exceed block size {block_size}")]
    ExceedsBlockSize {
        component: &'static str,
        requested: usize,
        block_size: usize,
    },

    #[error("{component}: pointer {addr:#x} was not allocated by this allocator")]
    ForeignPointer { component: &'static str, addr: usize },

    #[error("{component}: pointer {addr:#x} is already free")]
    DoubleFree { component: &'static str, addr: usize },

    // --- Guard Errors ---
    #[error("Memory guard requires a non-empty allocation")]
    EmptyAllocation,

    // --- Tracker Errors ---
    #[error("Invalid tracking request: {reason}")]
    InvalidTrackingRequest { reason: &'static str },

    #[error("Pointer {addr:#x} is not tracked ({file}:{line})")]
    UntrackedPointer {
        addr: usize,
        file: &'static str,
        line: u32,
    },

    // --- Utility Errors ---
    #[error("Length mismatch: destination {dst} bytes, source {src} bytes")]
    LengthMismatch { dst: usize, src: usize },
}

impl MemoryError {
    /// Check if the error signals a programming error rather than a bad
    /// runtime condition
    #[must_use]
    pub fn is_logic_error(&self) -> bool {
        matches!(
            self,
            Self::ForeignPointer { .. }
                | Self::DoubleFree { .. }
                | Self::ExceedsBlockSize { .. }
                | Self::EmptyAllocation
                | Self::UntrackedPointer { .. }
        )
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "MEM:ALLOC:FAILED",
            Self::InvalidAlignment { .. } => "MEM:ALLOC:ALIGN",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::ExceedsBlockSize { .. } => "MEM:DEALLOC:SIZE",
            Self::ForeignPointer { .. } => "MEM:DEALLOC:FOREIGN",
            Self::DoubleFree { .. } => "MEM:DEALLOC:DOUBLE_FREE",
            Self::EmptyAllocation => "MEM:GUARD:EMPTY",
            Self::InvalidTrackingRequest { .. } => "MEM:TRACK:INVALID",
            Self::UntrackedPointer { .. } => "MEM:TRACK:UNTRACKED",
            Self::LengthMismatch { .. } => "MEM:UTIL:LENGTH",
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create allocation failed error
    pub fn allocation_failed(size: usize, align: usize) -> Self {
        error!(
            target: "senkaid_memory",
            size, align, "memory allocation failed"
        );

        Self::AllocationFailed { size, align }
    }

    /// Create allocation failed error from layout
    pub fn allocation_failed_with_layout(layout: Layout) -> Self {
        Self::allocation_failed(layout.size(), layout.align())
    }

    /// Create invalid alignment error
    pub fn invalid_alignment(alignment: usize) -> Self {
        Self::InvalidAlignment {
            alignment,
            min: crate::core::types::alignment::MIN_ALIGN,
        }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create foreign pointer error
    pub fn foreign_pointer<T>(component: &'static str, ptr: *const T) -> Self {
        Self::ForeignPointer {
            component,
            addr: ptr as usize,
        }
    }

    /// Create double free error
    pub fn double_free<T>(component: &'static str, ptr: *const T) -> Self {
        Self::DoubleFree {
            component,
            addr: ptr as usize,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

// ============================================================================
// Tests
// ============================================================================
