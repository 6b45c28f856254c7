//! Core traits shared by the allocators

/// Memory usage reporting
///
/// Implemented by every allocator that owns a fixed backing block, so all of
/// them report capacity the same way.
pub trait MemoryUsage {
    /// Get currently used memory in bytes
    fn used_memory(&self) -> usize;

    /// Get available memory in bytes
    fn available_memory(&self) -> usize;

    /// Get total memory capacity in bytes
    fn total_memory(&self) -> usize {
        self.used_memory() + self.available_memory()
    }

    /// Returns memory usage as a percentage (0.0 to 100.0)
    fn memory_usage_percent(&self) -> f32 {
        let total = self.total_memory();
        if total == 0 {
            0.0
        } else {
            (self.used_memory() as f32 / total as f32) * 100.0
        }
    }

    /// Returns a snapshot of the usage figures
    fn memory_usage(&self) -> BasicMemoryUsage {
        BasicMemoryUsage {
            used: self.used_memory(),
            available: self.available_memory(),
            total: self.total_memory(),
        }
    }
}

/// Point-in-time memory usage figures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicMemoryUsage {
    /// Currently used memory in bytes
    pub used: usize,
    /// Available memory in bytes
    pub available: usize,
    /// Total capacity in bytes
    pub total: usize,
}

impl core::fmt::Display for BasicMemoryUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "used: {} bytes, total: {} bytes", self.used, self.total)
    }
}

/// Allocators that can discard every outstanding allocation at once
///
/// `reset` takes `&mut self`: any region borrowed from the allocator must be
/// gone before it can be called.
pub trait Resettable {
    /// Return the allocator to its freshly constructed state
    fn reset(&mut self);
}
