//! Updatable min-priority queue with lazy deletion.
//!
//! The strategy search repeatedly re-prioritises the same links as labels
//! improve. Instead of a true decrease-key, every `push` inserts a fresh heap
//! entry and marks any earlier entry for the same key as stale; stale entries
//! are skipped when they reach the top of the heap.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use ordered_float::OrderedFloat;

/// Stale entries are compacted away once they outnumber live ones by this
/// many.
const COMPACT_SLACK: usize = 1024;

/// A heap entry. Ordered by priority, then by insertion sequence so that
/// equal priorities pop first-in first-out.
#[derive(Debug)]
struct Entry<K, P> {
    priority: P,
    sequence: u64,
    key: K,
}

impl<K, P: Ord> PartialEq for Entry<K, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K, P: Ord> Eq for Entry<K, P> {}

impl<K, P: Ord> PartialOrd for Entry<K, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, P: Ord> Ord for Entry<K, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// A min-priority queue keyed by entity identity.
///
/// At most one entry per key is live at any time. Pushing a key that is
/// already queued replaces its priority.
///
/// # Examples
///
/// ```
/// use hyperpath::queue::UpdatablePriorityQueue;
///
/// let mut queue = UpdatablePriorityQueue::new();
/// queue.push("a", 5);
/// queue.push("b", 3);
/// queue.push("a", 1); // replaces the earlier entry for "a"
///
/// assert_eq!(queue.len(), 2);
/// assert_eq!(queue.pop(), Some(("a", 1)));
/// assert_eq!(queue.pop(), Some(("b", 3)));
/// assert_eq!(queue.pop(), None);
/// ```
#[derive(Debug)]
pub struct UpdatablePriorityQueue<K, P> {
    heap: BinaryHeap<Reverse<Entry<K, P>>>,
    /// Sequence number of the live entry for each queued key.
    live: HashMap<K, u64>,
    next_sequence: u64,
}

impl<K, P> UpdatablePriorityQueue<K, P>
where
    K: Hash + Eq + Clone,
    P: Ord,
{
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_sequence: 0,
        }
    }

    /// Create an empty queue with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            live: HashMap::with_capacity(capacity),
            next_sequence: 0,
        }
    }

    /// Insert `key` with `priority`, invalidating any queued entry for the
    /// same key.
    pub fn push(&mut self, key: K, priority: P) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.live.insert(key.clone(), sequence);
        self.heap.push(Reverse(Entry {
            priority,
            sequence,
            key,
        }));

        if self.heap.len() > 2 * self.live.len() + COMPACT_SLACK {
            self.compact();
        }
    }

    /// Change the priority of `key`. Equivalent to [`push`](Self::push).
    pub fn update(&mut self, key: K, priority: P) {
        self.push(key, priority);
    }

    /// Remove and return the live entry with the smallest priority.
    pub fn pop(&mut self) -> Option<(K, P)> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            if self.live.get(&entry.key) == Some(&entry.sequence) {
                self.live.remove(&entry.key);
                return Some((entry.key, entry.priority));
            }
        }
        None
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop stale entries from the heap.
    fn compact(&mut self) {
        let live = &self.live;
        self.heap
            .retain(|Reverse(entry)| live.get(&entry.key) == Some(&entry.sequence));
    }
}

impl<K, P> Default for UpdatablePriorityQueue<K, P>
where
    K: Hash + Eq + Clone,
    P: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A two-level priority for reliability searches.
///
/// Primary values within `epsilon` of each other fall into the same bucket
/// and are then ordered by the secondary value. Both are minimised, so a
/// search that maximises reliability and prefers smaller mean times pushes
/// `DualPriority::new(-reliability, mean, epsilon)`.
///
/// # Examples
///
/// ```
/// use hyperpath::queue::DualPriority;
///
/// let a = DualPriority::new(-0.9, 30.0, 1e-6);
/// let b = DualPriority::new(-0.9 + 1e-9, 20.0, 1e-6);
/// let c = DualPriority::new(-0.5, 10.0, 1e-6);
///
/// // Near-equal primaries: the smaller secondary wins
/// assert!(b < a);
/// // Otherwise the primary decides
/// assert!(a < c);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DualPriority {
    bucket: OrderedFloat<f64>,
    secondary: OrderedFloat<f64>,
    primary: OrderedFloat<f64>,
}

impl DualPriority {
    /// Create a priority. A non-positive `epsilon` disables bucketing.
    pub fn new(primary: f64, secondary: f64, epsilon: f64) -> Self {
        let bucket = if epsilon > 0.0 {
            (primary / epsilon).round()
        } else {
            primary
        };
        Self {
            bucket: OrderedFloat(bucket),
            secondary: OrderedFloat(secondary),
            primary: OrderedFloat(primary),
        }
    }

    pub fn primary(&self) -> f64 {
        self.primary.0
    }

    pub fn secondary(&self) -> f64 {
        self.secondary.0
    }
}
