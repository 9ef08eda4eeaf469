use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap entry ordered by priority, then by insertion sequence.
///
/// Among equal priorities the most recently pushed entry sorts last, so it is
/// the first to be evicted.
struct Entry<T> {
    priority: f64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Keeps the `bound` items with the smallest priority seen so far.
///
/// Backed by a max-heap, so the worst retained item is always on top and can
/// be compared against (or evicted for) a better candidate in O(log n).
pub struct BoundedPriorityQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    bound: usize,
    next_seq: u64,
}

impl<T> BoundedPriorityQueue<T> {
    pub fn new(bound: usize) -> Self {
        BoundedPriorityQueue {
            heap: BinaryHeap::with_capacity(bound.saturating_add(1).min(1024)),
            bound,
            next_seq: 0,
        }
    }

    /// Offer an item. Ignored when the queue is full and `priority` is not
    /// strictly better than the current worst.
    pub fn push(&mut self, item: T, priority: f64) {
        if self.bound == 0 {
            return;
        }
        if self.is_full() {
            match self.peek_priority() {
                Some(worst) if priority >= worst => return,
                _ => {
                    self.heap.pop();
                }
            }
        }
        self.heap.push(Entry {
            priority,
            seq: self.next_seq,
            item,
        });
        self.next_seq += 1;
    }

    /// Worst retained item and its priority.
    pub fn peek(&self) -> Option<(f64, &T)> {
        self.heap.peek().map(|e| (e.priority, &e.item))
    }

    pub fn peek_priority(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.priority)
    }

    /// Remove and return the worst retained item.
    pub fn pop(&mut self) -> Option<(f64, T)> {
        self.heap.pop().map(|e| (e.priority, e.item))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.bound
    }

    /// Consume the queue, returning items in ascending priority order.
    pub fn into_sorted_vec(self) -> Vec<(f64, T)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| (e.priority, e.item))
            .collect()
    }
}
