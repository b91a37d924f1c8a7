use crate::error::{Error, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Min-ordered priority queue over any totally ordered item.
///
/// Thin adapter over the standard max-heap with reversed ordering.
/// Duplicates are allowed; equal items extract in an unspecified relative
/// order, which is why `Event` carries its own total-order tie-breakers.
#[derive(Debug, Clone)]
pub struct MinQueue<T: Ord> {
    heap: BinaryHeap<Reverse<T>>,
}

impl<T: Ord> MinQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Insert an item.
    #[inline]
    pub fn insert(&mut self, item: T) {
        self.heap.push(Reverse(item));
    }

    /// Remove and return the minimum item.
    ///
    /// Errors:
    /// - `Error::EmptyQueue` when the queue holds nothing.
    #[inline]
    pub fn extract_min(&mut self) -> Result<T> {
        self.heap.pop().map(|Reverse(t)| t).ok_or(Error::EmptyQueue)
    }

    /// Peek at the minimum item without removing it.
    #[inline]
    pub fn peek_min(&self) -> Option<&T> {
        self.heap.peek().map(|Reverse(t)| t)
    }

    /// Whether the queue holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of items held.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Drop all items.
    #[inline]
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<T: Ord> Default for MinQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
