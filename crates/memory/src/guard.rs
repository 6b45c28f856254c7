//! RAII ownership of one array allocation
//!
//! A [`MemoryGuard`] is the single owner of a boxed slice. Dropping the guard
//! frees the slice; ownership moves with the guard, can be handed to a new
//! guard with [`MemoryGuard::take`], or given up with
//! [`MemoryGuard::release`].
//!
//! A guard built with [`MemoryGuard::tracked`] reports its allocation to a
//! [`MemoryTracker`] and reports the matching deallocation exactly once,
//! from whichever guard ends up dropping the data.
//!
//! # Examples
//! ```
//! use senkaid_memory::guard::MemoryGuard;
//!
//! let mut guard = MemoryGuard::new(vec![0.0f64; 16].into_boxed_slice());
//! guard.get_mut().unwrap()[0] = 1.5;
//!
//! let owner = guard.take();
//! assert!(!guard.is_owned());
//! assert_eq!(owner.count(), 16);
//! ```

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{MemoryError, MemoryResult};
use crate::tracker::MemoryTracker;

/// Exclusive owner of a boxed array
///
/// A guard is either *owning* (holds a non-empty array) or *neutral* (holds
/// nothing, drop is a no-op). `Default` builds a neutral guard.
pub struct MemoryGuard<T> {
    data: Option<Box<[T]>>,
    tracker: Option<Arc<MemoryTracker>>,
}

impl<T> MemoryGuard<T> {
    /// Take ownership of `data`
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    #[track_caller]
    pub fn new(data: Box<[T]>) -> Self {
        match Self::try_new(data) {
            Ok(guard) => guard,
            Err(err) => panic!("MemoryGuard: {err}"),
        }
    }

    /// Take ownership of `data`, rejecting an empty array
    pub fn try_new(data: Box<[T]>) -> MemoryResult<Self> {
        if data.is_empty() {
            return Err(MemoryError::EmptyAllocation);
        }
        trace!(target: "senkaid_memory::guard", count = data.len(), "guard acquired");
        Ok(Self {
            data: Some(data),
            tracker: None,
        })
    }

    /// Take ownership of `data` and report it to `tracker`
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    #[track_caller]
    pub fn tracked(data: Box<[T]>, tracker: Arc<MemoryTracker>) -> Self {
        let mut guard = Self::new(data);
        let (ptr, bytes) = guard.extent();
        let location = core::panic::Location::caller();
        // Zero-sized element types have no bytes to account for.
        if bytes > 0
            && tracker
                .track_allocation_at(ptr, bytes, location.file(), location.line())
                .is_ok()
        {
            guard.tracker = Some(tracker);
        }
        guard
    }

    fn extent(&self) -> (*const T, usize) {
        match &self.data {
            Some(data) => (data.as_ptr(), size_of_val(&**data)),
            None => (core::ptr::null(), 0),
        }
    }

    /// Move ownership into a new guard, leaving this one neutral
    #[must_use = "dropping the returned guard frees the array immediately"]
    pub fn take(&mut self) -> Self {
        Self {
            data: self.data.take(),
            tracker: self.tracker.take(),
        }
    }

    /// Give up ownership without freeing
    ///
    /// The guard becomes neutral. A tracker entry, if any, stays in place for
    /// the new owner to settle.
    pub fn release(&mut self) -> Option<Box<[T]>> {
        self.tracker = None;
        let data = self.data.take();
        if let Some(data) = &data {
            debug!(
                target: "senkaid_memory::guard",
                count = data.len(),
                "guard released ownership"
            );
        }
        data
    }

    /// Shared view of the array, `None` if neutral
    pub fn get(&self) -> Option<&[T]> {
        self.data.as_deref()
    }

    /// Exclusive view of the array, `None` if neutral
    pub fn get_mut(&mut self) -> Option<&mut [T]> {
        self.data.as_deref_mut()
    }

    /// Number of elements owned, 0 if neutral
    pub fn count(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.len())
    }

    /// Whether the guard currently owns an array
    pub fn is_owned(&self) -> bool {
        self.data.is_some()
    }

    /// Whether deallocation will be reported to a tracker
    pub fn is_tracked(&self) -> bool {
        self.tracker.is_some()
    }
}

impl<T> Default for MemoryGuard<T> {
    fn default() -> Self {
        Self {
            data: None,
            tracker: None,
        }
    }
}

impl<T> Drop for MemoryGuard<T> {
    fn drop(&mut self) {
        let Some(data) = self.data.take() else {
            return;
        };
        if let Some(tracker) = self.tracker.take() {
            let _ = tracker.track_deallocation(data.as_ptr());
        }
        trace!(target: "senkaid_memory::guard", count = data.len(), "guard freed array");
        drop(data);
    }
}

impl<T> core::fmt::Debug for MemoryGuard<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryGuard")
            .field("count", &self.count())
            .field("owned", &self.is_owned())
            .field("tracked", &self.is_tracked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_access() {
        let mut guard = MemoryGuard::new(vec![1u32, 2, 3].into_boxed_slice());
        assert!(guard.is_owned());
        assert_eq!(guard.count(), 3);
        guard.get_mut().expect("owned")[1] = 20;
        assert_eq!(guard.get(), Some(&[1u32, 20, 3][..]));
    }

    #[test]
    fn test_empty_rejected() {
        let empty: Box<[u8]> = Box::new([]);
        assert_eq!(
            MemoryGuard::try_new(empty).unwrap_err(),
            MemoryError::EmptyAllocation
        );
    }

    #[test]
    #[should_panic(expected = "MemoryGuard")]
    fn test_new_panics_on_empty() {
        let _ = MemoryGuard::<u8>::new(Box::new([]));
    }

    #[test]
    fn test_take_leaves_neutral() {
        let mut source = MemoryGuard::new(vec![7u8; 4].into_boxed_slice());
        let target = source.take();
        assert!(source.get().is_none());
        assert_eq!(source.count(), 0);
        assert_eq!(target.count(), 4);

        let mut again = std::mem::take(&mut source);
        assert!(!again.is_owned());
        assert!(again.release().is_none());
    }

    #[test]
    fn test_tracked_drop_reports_once() {
        let tracker = MemoryTracker::shared();
        let mut first =
            MemoryGuard::tracked(vec![0u64; 8].into_boxed_slice(), Arc::clone(&tracker));
        assert_eq!(tracker.get_total_allocated(), 64);

        let second = first.take();
        drop(first);
        assert_eq!(tracker.get_allocation_count(), 1);

        drop(second);
        assert_eq!(tracker.get_allocation_count(), 0);
        assert_eq!(tracker.get_total_allocated(), 0);
    }

    #[test]
    fn test_release_keeps_tracker_entry() {
        let tracker = MemoryTracker::shared();
        let mut guard =
            MemoryGuard::tracked(vec![1u8; 16].into_boxed_slice(), Arc::clone(&tracker));
        let data = guard.release().expect("owned");
        drop(guard);
        assert!(tracker.is_tracked(data.as_ptr()));

        tracker.track_deallocation(data.as_ptr()).expect("tracked");
    }
}
