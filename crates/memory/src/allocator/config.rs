//! Construction configuration for the allocators
//!
//! Both configs are plain serde structs so they can live in a host
//! application's settings file. `validate()` applies the same checks the
//! constructors do.

use serde::{Deserialize, Serialize};

use crate::core::types::alignment;
use crate::error::{MemoryError, MemoryResult};
use crate::utils::is_valid_alignment;

/// Configuration for [`Arena`](super::Arena) and
/// [`FallbackAllocator`](super::FallbackAllocator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Size of the backing block in bytes
    pub size: usize,
    /// Alignment of the backing block and minimum alignment of every region
    pub alignment: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size: 64 * crate::core::types::size::KB,
            alignment: alignment::DEFAULT,
        }
    }
}

impl ArenaConfig {
    /// Config with the given size and the default alignment
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Set backing block size
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set block alignment
    #[must_use]
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Check the config without allocating anything
    pub fn validate(&self) -> MemoryResult<()> {
        if self.size == 0 {
            return Err(MemoryError::invalid_config("arena size must be non-zero"));
        }
        if !is_valid_alignment(self.alignment) {
            return Err(MemoryError::invalid_alignment(self.alignment));
        }
        Ok(())
    }
}

/// Configuration for [`MemoryPool`](super::MemoryPool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Size of each block in bytes
    pub block_size: usize,
    /// Number of blocks
    pub num_blocks: usize,
    /// Alignment of the backing buffer
    pub alignment: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: 64,
            num_blocks: 1024,
            alignment: alignment::DEFAULT,
        }
    }
}

impl PoolConfig {
    /// Config with the given geometry and the default alignment
    #[must_use]
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        Self {
            block_size,
            num_blocks,
            ..Self::default()
        }
    }

    /// Set block size
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set number of blocks
    #[must_use]
    pub fn with_num_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    /// Set buffer alignment
    #[must_use]
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Total buffer size, if it does not overflow
    pub fn total_size(&self) -> Option<usize> {
        self.block_size.checked_mul(self.num_blocks)
    }

    /// Check the config without allocating anything
    pub fn validate(&self) -> MemoryResult<()> {
        if self.block_size == 0 {
            return Err(MemoryError::invalid_config("pool block size must be non-zero"));
        }
        if self.num_blocks == 0 {
            return Err(MemoryError::invalid_config("pool block count must be non-zero"));
        }
        if !is_valid_alignment(self.alignment) {
            return Err(MemoryError::invalid_alignment(self.alignment));
        }
        if self.total_size().is_none() {
            return Err(MemoryError::size_overflow("pool block_size * num_blocks"));
        }
        Ok(())
    }
}
