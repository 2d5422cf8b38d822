//! Priority queue for pending tasks
//!
//! Higher priority dequeues first; equal priorities dequeue in insertion
//! order. No internal locking - the engine owns the queue behind its lock.

use std::collections::BinaryHeap;

use crate::domain::Priority;

/// A queued item with its ordering keys
#[derive(Debug, Clone)]
struct QueueEntry<T> {
    priority: Priority,
    seq: u64,
    item: T,
}

impl<T> Eq for QueueEntry<T> {}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<T> Ord for QueueEntry<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher priority first, then earlier insertion
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap keyed by priority, FIFO among ties
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<QueueEntry<T>>,
    next_seq: u64,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Insert an item at the given priority (O(log n))
    pub fn enqueue(&mut self, item: T, priority: Priority) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueueEntry { priority, seq, item });
    }

    /// Remove and return the most urgent item (O(log n))
    pub fn dequeue(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    /// Priority of the item `dequeue` would return next
    pub fn peek_priority(&self) -> Option<Priority> {
        self.heap.peek().map(|entry| entry.priority)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Linear scan for diagnostics (order is unspecified)
    pub fn find<P>(&self, mut predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.heap.iter().map(|entry| &entry.item).find(|item| predicate(item))
    }

    /// Whether any queued item matches
    pub fn contains<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.find(predicate).is_some()
    }

    /// Remove every item, returned in dequeue order
    pub fn drain_ordered(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.dequeue() {
            items.push(item);
        }
        items
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
