//! # senkaid-memory
//!
//! Low-level memory allocation layer for the senkaid numeric storage library.
//!
//! The crate provides:
//! - [`Arena`](allocator::Arena): bump-pointer allocation, released all at once
//! - [`FallbackAllocator`](allocator::FallbackAllocator): zero-filled bump
//!   allocation that can give back its most recent region
//! - [`MemoryPool`](allocator::MemoryPool): fixed-size blocks with an index
//!   free list
//! - [`MemoryGuard`](guard::MemoryGuard): RAII owner of one array allocation
//! - [`MemoryTracker`](tracker::MemoryTracker): thread-safe allocation ledger
//!   for leak and double-free diagnostics
//! - aligned allocation primitives ([`crate::core::block`]) and byte helpers
//!   ([`utils`])
//!
//! ## Quick Start
//!
//! ```rust
//! use senkaid_memory::prelude::*;
//!
//! let arena = Arena::new(4096, 64);
//! let row = arena.allocate_zeroed::<f64>(32).expect("fits");
//! row[0] = 1.0;
//!
//! let pool = MemoryPool::new(64, 16, 16);
//! let block = pool.allocate::<u32>(16).expect("fits one block");
//! pool.deallocate(block)?;
//! # Ok::<(), MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `tracking` (default): `track_alloc!` / `track_dealloc!` report to the
//!   tracker; without it they compile to nothing
//! - `strict-asserts`: detected programming errors (foreign or double-freed
//!   blocks, untracked deallocations) panic instead of only logging
//!
//! ## Errors and logging
//!
//! Running out of space is not an error: allocators return `None` and log.
//! Construction problems and misuse on release paths are reported as
//! [`MemoryError`]. All diagnostics go through `tracing` under the
//! `senkaid_memory::*` targets.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(unsafe_code)]
#![warn(rust_2018_idioms)]
// Precision loss in usize -> f32 casts is acceptable for usage percentages
#![allow(clippy::cast_precision_loss)]

#[macro_use]
mod macros;

// Error types
pub mod error;

// Core modules
pub mod allocator;
pub mod core;
pub mod guard;
pub mod tracker;
pub mod utils;

pub use crate::error::{MemoryError, MemoryResult, Result};

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::allocator::{
        Arena, ArenaConfig, FallbackAllocator, FallbackSlice, MemoryPool, PoolBlock, PoolConfig,
        Reclaim,
    };
    pub use crate::core::block::AlignedBlock;
    pub use crate::core::traits::{MemoryUsage, Resettable};
    pub use crate::error::{MemoryError, MemoryResult, Result};
    pub use crate::guard::MemoryGuard;
    pub use crate::tracker::{LeakRecord, MemoryTracker};
}
