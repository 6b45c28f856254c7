//! Allocators
//!
//! Each allocator acquires one [`AlignedBlock`](crate::core::AlignedBlock) at
//! construction and serves typed regions out of it:
//!
//! - [`Arena`]: bump pointer, no individual release
//! - [`FallbackAllocator`]: bump pointer, zero-filled regions, releases the
//!   most recent region
//! - [`MemoryPool`]: fixed-size blocks with an index free list
//!
//! None of them is `Sync`. Regions borrow their allocator, so they cannot
//! outlive it or survive a `reset`.

mod bump;

pub mod arena;
pub mod config;
pub mod fallback;
pub mod pool;

pub use arena::Arena;
pub use config::{ArenaConfig, PoolConfig};
pub use fallback::{FallbackAllocator, FallbackSlice, Reclaim};
pub use pool::{MemoryPool, PoolBlock};
