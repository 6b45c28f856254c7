//! Core building blocks for senkaid-memory
//!
//! - The aligned allocation primitive and [`AlignedBlock`]
//! - Traits shared by the allocators
//! - Common constants

pub mod block;
pub mod traits;
pub mod types;

pub use crate::error::{MemoryError, MemoryResult};
pub use block::{AlignedBlock, aligned_alloc, aligned_alloc_zeroed, aligned_free};
pub use traits::{BasicMemoryUsage, MemoryUsage, Resettable};
pub use types::*;
