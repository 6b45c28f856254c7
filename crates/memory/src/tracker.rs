//! Allocation ledger for leak and double-free diagnostics
//!
//! [`MemoryTracker`] maps live addresses to their size and the call site
//! that reported them. It never allocates or frees the memory it observes.
//!
//! A lazily created process-wide instance is available through
//! [`MemoryTracker::global`]; independent instances can be built with
//! [`MemoryTracker::new`] and injected where isolation matters (tests,
//! per-service accounting).
//!
//! Each address moves through two states:
//!
//! ```text
//! untracked --track_allocation--> tracked(size, site) --track_deallocation--> untracked
//! ```
//!
//! A transition from the wrong state is rejected and leaves the ledger as it
//! was.

use core::fmt;
use core::panic::Location;
use std::sync::{Arc, LazyLock};

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{MemoryError, MemoryResult};

static GLOBAL: LazyLock<MemoryTracker> = LazyLock::new(MemoryTracker::new);

/// What the tracker knows about one live allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationInfo {
    /// Size in bytes
    pub size: usize,
    /// Source file of the reporting call site
    pub file: &'static str,
    /// Source line of the reporting call site
    pub line: u32,
}

/// A live allocation at the time of a leak query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakRecord {
    /// Address of the allocation
    pub addr: usize,
    /// Size in bytes
    pub size: usize,
    /// Source file of the reporting call site
    pub file: &'static str,
    /// Source line of the reporting call site
    pub line: u32,
}

impl fmt::Display for LeakRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes at {:#x} allocated at {}:{}",
            self.size, self.addr, self.file, self.line
        )
    }
}

#[derive(Default)]
struct Ledger {
    live: HashMap<usize, AllocationInfo>,
    total: usize,
}

/// Thread-safe allocation ledger
#[derive(Default)]
pub struct MemoryTracker {
    ledger: Mutex<Ledger>,
}

impl MemoryTracker {
    /// Create an empty, independent tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tracker behind an `Arc`, ready to be shared
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// The process-wide tracker, created on first use
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Record an allocation at the caller's location
    #[track_caller]
    pub fn track_allocation<T>(&self, ptr: *const T, size: usize) -> MemoryResult<()> {
        let caller = Location::caller();
        self.track_allocation_at(ptr, size, caller.file(), caller.line())
    }

    /// Record an allocation at an explicit source location
    ///
    /// A null pointer or zero size is rejected. Reporting an address that is
    /// already tracked replaces the old entry and keeps the running total
    /// consistent.
    pub fn track_allocation_at<T>(
        &self,
        ptr: *const T,
        size: usize,
        file: &'static str,
        line: u32,
    ) -> MemoryResult<()> {
        if ptr.is_null() {
            warn!(target: "senkaid_memory::tracker", file, line, "tracking null pointer");
            return Err(MemoryError::InvalidTrackingRequest {
                reason: "null pointer",
            });
        }
        if size == 0 {
            warn!(target: "senkaid_memory::tracker", file, line, "tracking zero-size allocation");
            return Err(MemoryError::InvalidTrackingRequest {
                reason: "zero size",
            });
        }

        let addr = ptr as usize;
        let info = AllocationInfo { size, file, line };
        let mut ledger = self.ledger.lock();
        if let Some(previous) = ledger.live.insert(addr, info) {
            ledger.total -= previous.size;
            warn!(
                target: "senkaid_memory::tracker",
                addr,
                previous_file = previous.file,
                previous_line = previous.line,
                "address tracked again without deallocation"
            );
        }
        ledger.total += size;
        let total = ledger.total;
        drop(ledger);

        debug!(
            target: "senkaid_memory::tracker",
            addr,
            size,
            total,
            file,
            line,
            "allocation tracked"
        );
        Ok(())
    }

    /// Record a deallocation at the caller's location
    #[track_caller]
    pub fn track_deallocation<T>(&self, ptr: *const T) -> MemoryResult<AllocationInfo> {
        let caller = Location::caller();
        self.track_deallocation_at(ptr, caller.file(), caller.line())
    }

    /// Record a deallocation at an explicit source location
    ///
    /// Returns the entry that was removed. An address that is not tracked
    /// yields [`MemoryError::UntrackedPointer`] and changes nothing.
    pub fn track_deallocation_at<T>(
        &self,
        ptr: *const T,
        file: &'static str,
        line: u32,
    ) -> MemoryResult<AllocationInfo> {
        if ptr.is_null() {
            warn!(target: "senkaid_memory::tracker", file, line, "untracking null pointer");
            return Err(MemoryError::InvalidTrackingRequest {
                reason: "null pointer",
            });
        }

        let addr = ptr as usize;
        let mut ledger = self.ledger.lock();
        let Some(info) = ledger.live.remove(&addr) else {
            drop(ledger);
            let err = MemoryError::UntrackedPointer { addr, file, line };
            invariant_violation!(target: "senkaid_memory::tracker", err);
            return Err(err);
        };
        ledger.total -= info.size;
        let total = ledger.total;
        drop(ledger);

        debug!(
            target: "senkaid_memory::tracker",
            addr,
            size = info.size,
            total,
            file,
            line,
            "deallocation tracked"
        );
        Ok(info)
    }

    /// Sum of the sizes of all live allocations
    pub fn get_total_allocated(&self) -> usize {
        self.ledger.lock().total
    }

    /// Number of live allocations
    pub fn get_allocation_count(&self) -> usize {
        self.ledger.lock().live.len()
    }

    /// Whether `ptr` is currently tracked
    pub fn is_tracked<T>(&self, ptr: *const T) -> bool {
        self.ledger.lock().live.contains_key(&(ptr as usize))
    }

    /// Snapshot of the live allocations, sorted by address
    pub fn leaks(&self) -> Vec<LeakRecord> {
        let mut leaks: Vec<LeakRecord> = self
            .ledger
            .lock()
            .live
            .iter()
            .map(|(&addr, info)| LeakRecord {
                addr,
                size: info.size,
                file: info.file,
                line: info.line,
            })
            .collect();
        leaks.sort_unstable_by_key(|leak| leak.addr);
        leaks
    }

    /// Log every live allocation and return how many there are
    pub fn report_leaks(&self) -> usize {
        let leaks = self.leaks();
        if leaks.is_empty() {
            info!(target: "senkaid_memory::tracker", "no memory leaks detected");
            return 0;
        }

        for leak in &leaks {
            warn!(
                target: "senkaid_memory::tracker",
                addr = leak.addr,
                size = leak.size,
                file = leak.file,
                line = leak.line,
                "memory leak: {leak}"
            );
        }
        info!(
            target: "senkaid_memory::tracker",
            count = leaks.len(),
            bytes = leaks.iter().map(|leak| leak.size).sum::<usize>(),
            "memory leak report complete"
        );
        leaks.len()
    }

    /// Forget every entry
    pub fn clear(&self) {
        let mut ledger = self.ledger.lock();
        ledger.live.clear();
        ledger.total = 0;
    }
}

impl fmt::Debug for MemoryTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ledger = self.ledger.lock();
        f.debug_struct("MemoryTracker")
            .field("allocations", &ledger.live.len())
            .field("total_allocated", &ledger.total)
            .finish()
    }
}
