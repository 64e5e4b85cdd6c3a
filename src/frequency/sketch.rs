use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default resolution when no `-k` is given.
pub const DEFAULT_K: usize = 1024;

/// Retention policy for reported frequent items.
///
/// - `NoFalsePositives`: every reported item is guaranteed to exceed the
///   sketch's error threshold; some qualifying items may be omitted.
/// - `NoFalseNegatives`: every item that could exceed the threshold is
///   reported; some reported items may not truly qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    NoFalsePositives,
    NoFalseNegatives,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Counter {
    /// Estimated count; never underestimates the true count.
    count: u64,
    /// Maximum overcount folded into `count` when this counter took over an
    /// evicted slot.
    error: u64,
}

/// One reported frequent item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub item: String,
    /// Upper-bound frequency estimate.
    pub estimate: u64,
    /// Guaranteed minimum true count.
    pub lower_bound: u64,
}

/// Frequent-items sketch over text items, space-saving counter family.
///
/// Maintains at most `k` counters. A tracked item's estimate never
/// underestimates its true count, and overestimates it by at most the
/// counter's recorded error. Untracked items report zero.
///
/// # Key Properties
///
/// - **Fixed Memory**: at most `k` counters regardless of distinct items.
/// - **Deterministic Bounds**: for every tracked item the true count lies in
///   `[count - error, count]`.
/// - **Mergeable**: sketches built over partitions of a stream combine into
///   one summarizing the whole stream.
///
/// # Example
///
/// ```
/// use stream_summaries::FrequentItemsSketch;
///
/// let mut sketch = FrequentItemsSketch::new(64);
/// sketch.update("apple", 3);
/// sketch.update("banana", 1);
///
/// assert!(sketch.estimate("apple") >= 3);
/// assert_eq!(sketch.estimate("cherry"), 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequentItemsSketch {
    capacity: usize,
    counters: HashMap<String, Counter>,
    stream_weight: u64,
    /// Largest count discarded while shrinking a merged sketch back to
    /// capacity. Any item absent from the counters has a true count of at
    /// most this value.
    purge_floor: u64,
}

impl FrequentItemsSketch {
    /// Creates an empty sketch holding at most `k` counters.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero. Callers resolve and validate `k` before
    /// construction.
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "resolution parameter k must be positive, got {}", k);
        Self {
            capacity: k,
            counters: HashMap::with_capacity(k),
            stream_weight: 0,
            purge_floor: 0,
        }
    }

    /// Increments the estimated frequency of `item` by `weight`.
    ///
    /// Weight validation (positive integer) happens at line parse time, not
    /// here.
    pub fn update(&mut self, item: &str, weight: u64) {
        self.stream_weight += weight;

        if let Some(counter) = self.counters.get_mut(item) {
            counter.count += weight;
            return;
        }

        if self.counters.len() < self.capacity {
            self.counters.insert(
                item.to_string(),
                Counter {
                    count: weight,
                    error: 0,
                },
            );
            return;
        }

        // At capacity: the new item takes over the smallest counter's slot,
        // inheriting its count as both headstart and error bound.
        let (evicted, floor) = self
            .counters
            .iter()
            .min_by(|a, b| a.1.count.cmp(&b.1.count).then_with(|| a.0.cmp(b.0)))
            .map(|(item, counter)| (item.clone(), counter.count))
            .expect("capacity is positive");
        self.counters.remove(&evicted);
        self.counters.insert(
            item.to_string(),
            Counter {
                count: floor + weight,
                error: floor,
            },
        );
    }

    /// Upper-bound frequency estimate; zero for untracked items.
    pub fn estimate(&self, item: &str) -> u64 {
        self.counters.get(item).map_or(0, |c| c.count)
    }

    /// Upper bound on the estimation error for any reported item's
    /// frequency.
    pub fn max_error(&self) -> u64 {
        self.counters
            .values()
            .map(|c| c.error)
            .max()
            .unwrap_or(0)
            .max(self.purge_floor)
    }

    /// Total weight processed, across merges.
    pub fn stream_weight(&self) -> u64 {
        self.stream_weight
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_tracked(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream_weight == 0
    }

    /// Returns the frequent items qualifying under `error_type`, sorted by
    /// estimate descending (ties by item for stable output).
    pub fn frequent_items(&self, error_type: ErrorType) -> Vec<Row> {
        let threshold = self.max_error();
        let mut rows: Vec<Row> = self
            .counters
            .iter()
            .filter(|(_, c)| match error_type {
                ErrorType::NoFalsePositives => c.count.saturating_sub(c.error) > threshold,
                ErrorType::NoFalseNegatives => c.count > threshold,
            })
            .map(|(item, c)| Row {
                item: item.clone(),
                estimate: c.count,
                lower_bound: c.count.saturating_sub(c.error),
            })
            .collect();
        rows.sort_by(|a, b| b.estimate.cmp(&a.estimate).then_with(|| a.item.cmp(&b.item)));
        rows
    }

    /// Combines sketches into one of resolution `k` that estimates as if
    /// every update had been applied to a single sketch.
    ///
    /// Per-item counts and errors add across parts. If the union holds more
    /// than `k` items, only the `k` largest survive and the purge floor
    /// rises to the largest discarded count, preserving the error bound.
    pub fn merged(k: usize, parts: &[Self]) -> Self {
        let mut union: HashMap<String, Counter> = HashMap::new();
        let mut stream_weight = 0u64;
        let mut purge_floor = 0u64;

        for part in parts {
            stream_weight += part.stream_weight;
            purge_floor = purge_floor.max(part.purge_floor);
            for (item, counter) in &part.counters {
                let entry = union
                    .entry(item.clone())
                    .or_insert(Counter { count: 0, error: 0 });
                entry.count += counter.count;
                entry.error += counter.error;
            }
        }

        if union.len() > k {
            let mut entries: Vec<(String, Counter)> = union.into_iter().collect();
            entries.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));
            for (_, dropped) in &entries[k..] {
                purge_floor = purge_floor.max(dropped.count);
            }
            entries.truncate(k);
            union = entries.into_iter().collect();
        }

        Self {
            capacity: k,
            counters: union,
            stream_weight,
            purge_floor,
        }
    }
}
