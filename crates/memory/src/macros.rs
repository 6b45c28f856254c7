//! Macros for senkaid-memory
//!
//! `track_alloc!` / `track_dealloc!` record the call site with the tracker
//! and compile to nothing without the `tracking` feature.
//! `invariant_violation!` is crate-internal.

/// Report a detected programming error
///
/// Always logs the error as a warning. With the `strict-asserts` feature it
/// panics afterwards. The calling operation still returns the error as an
/// `Err` in both builds.
macro_rules! invariant_violation {
    (target: $target:expr, $err:expr $(,)?) => {{
        let err: &$crate::error::MemoryError = &$err;
        ::tracing::warn!(target: $target, code = err.code(), "{err}");
        if cfg!(feature = "strict-asserts") {
            panic!("invariant violation: {err}");
        }
    }};
}

/// Record an allocation with the current file and line
///
/// Reports to the global tracker unless a tracker is given first. Tracking
/// errors are logged by the tracker and otherwise ignored.
///
/// # Examples
/// ```
/// use senkaid_memory::{track_alloc, track_dealloc};
/// use senkaid_memory::tracker::MemoryTracker;
///
/// let tracker = MemoryTracker::new();
/// let data = vec![0u8; 32];
///
/// track_alloc!(tracker, data.as_ptr(), data.len());
/// # #[cfg(feature = "tracking")]
/// assert_eq!(tracker.get_allocation_count(), 1);
///
/// track_dealloc!(tracker, data.as_ptr());
/// assert_eq!(tracker.get_allocation_count(), 0);
/// ```
#[cfg(feature = "tracking")]
#[macro_export]
macro_rules! track_alloc {
    ($ptr:expr, $size:expr $(,)?) => {
        $crate::track_alloc!($crate::tracker::MemoryTracker::global(), $ptr, $size)
    };
    ($tracker:expr, $ptr:expr, $size:expr $(,)?) => {{
        let _ = $tracker.track_allocation_at($ptr as *const _, $size, file!(), line!());
    }};
}

/// Record an allocation with the current file and line (disabled)
#[cfg(not(feature = "tracking"))]
#[macro_export]
macro_rules! track_alloc {
    ($ptr:expr, $size:expr $(,)?) => {{
        let _ = (&$ptr, &$size);
    }};
    ($tracker:expr, $ptr:expr, $size:expr $(,)?) => {{
        let _ = (&$tracker, &$ptr, &$size);
    }};
}

/// Record a deallocation with the current file and line
///
/// Reports to the global tracker unless a tracker is given first.
#[cfg(feature = "tracking")]
#[macro_export]
macro_rules! track_dealloc {
    ($ptr:expr $(,)?) => {
        $crate::track_dealloc!($crate::tracker::MemoryTracker::global(), $ptr)
    };
    ($tracker:expr, $ptr:expr $(,)?) => {{
        let _ = $tracker.track_deallocation_at($ptr as *const _, file!(), line!());
    }};
}

/// Record a deallocation with the current file and line (disabled)
#[cfg(not(feature = "tracking"))]
#[macro_export]
macro_rules! track_dealloc {
    ($ptr:expr $(,)?) => {{
        let _ = &$ptr;
    }};
    ($tracker:expr, $ptr:expr $(,)?) => {{
        let _ = (&$tracker, &$ptr);
    }};
}
