//! Common types and constants for memory management

/// Memory alignment requirements
pub mod alignment {
    /// Minimum alignment accepted by every allocator: one pointer
    pub const MIN_ALIGN: usize = core::mem::size_of::<usize>();

    /// Default block alignment, matching the strictest fundamental alignment
    /// on mainstream 64-bit targets
    pub const DEFAULT: usize = 16;

    /// Cache line size, a common choice for numeric buffers
    pub const CACHE_LINE: usize = 64;

    /// Page size (platform dependent, this is common default)
    pub const PAGE_SIZE: usize = 4096;
}

/// Memory size constants
pub mod size {
    /// 1 Kilobyte
    pub const KB: usize = 1024;

    /// 1 Megabyte
    pub const MB: usize = 1024 * KB;

    /// 1 Gigabyte
    pub const GB: usize = 1024 * MB;
}
