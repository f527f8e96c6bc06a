//! Resources kept alive until the GPU passes a fence value

use std::collections::VecDeque;

/// FIFO of resources tagged with the fence value that must complete before
/// they may be dropped
///
/// Entries are pushed with non-decreasing fence values, so collection only
/// ever inspects the front of the queue.
pub struct DeferredReleaseQueue<T> {
    entries: VecDeque<(u64, Vec<T>)>,
}

impl<T> DeferredReleaseQueue<T> {
    pub fn new() -> Self {
        Self { entries: VecDeque::new() }
    }

    /// Retain `resources` until `fence_value` completes
    pub fn push(&mut self, fence_value: u64, resources: Vec<T>) {
        if resources.is_empty() {
            return;
        }
        debug_assert!(self.entries.back().map_or(true, |(v, _)| *v <= fence_value));
        self.entries.push_back((fence_value, resources));
    }

    /// Drop every entry whose fence value is `<= completed`; returns the number
    /// of resources released
    pub fn collect(&mut self, completed: u64) -> usize {
        let mut released = 0;
        while let Some((value, _)) = self.entries.front() {
            if *value > completed {
                break;
            }
            if let Some((_, resources)) = self.entries.pop_front() {
                released += resources.len();
            }
        }
        released
    }

    /// Drop everything regardless of fence values. Only valid once the GPU is idle.
    pub fn drain_all(&mut self) -> usize {
        let released = self.len();
        self.entries.clear();
        released
    }

    /// Number of resources still retained
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, r)| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for DeferredReleaseQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "deferred_release_tests.rs"]
mod tests;
