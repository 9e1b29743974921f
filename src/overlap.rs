//! Generic interval overlap detection
//!
//! An [`OverlapDetector`] associates opaque keys with coordinate intervals and
//! answers "which keys overlap this query range". Intervals are half-open
//! `[start, end)` over opaque integer coordinates; callers working with
//! inclusive ends pass `end + 1`. The structure is built once (or extended
//! incrementally) and then queried repeatedly without mutation.
//!
//! Internally this is an augmented interval list: entries sorted by start with
//! a running maximum of end positions, queried by binary search plus a
//! backward scan that terminates as soon as no earlier entry can reach the
//! query start.

/// A half-open coordinate interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}
impl Interval {
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// True if the two half-open intervals share at least one coordinate.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An augmented search structure over (interval, key) associations.
///
/// Every stored interval overlapping a query is reported once per stored
/// entry; keys are not deduplicated and no result order is promised beyond
/// "no false negatives".
#[derive(Debug, Clone, Default)]
pub struct OverlapDetector<K> {
    starts: Vec<u64>,
    ends: Vec<u64>,
    max_ends: Vec<u64>,
    keys: Vec<K>,
}
impl<K> OverlapDetector<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            starts: Vec::new(),
            ends: Vec::new(),
            max_ends: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Bulk-loads the detector from a set of associations.
    #[must_use]
    pub fn build(entries: Vec<(Interval, K)>) -> Self {
        let mut entries = entries;
        entries.sort_by_key(|(interval, _)| (interval.start, interval.end));

        let mut detector = Self::new();
        for (interval, key) in entries {
            detector.starts.push(interval.start);
            detector.ends.push(interval.end);
            detector.keys.push(key);
        }
        detector.max_ends = vec![0; detector.ends.len()];
        detector.rebuild_max_ends(0);
        detector
    }

    /// Adds one association, keeping the structure queryable.
    pub fn insert(&mut self, key: K, interval: Interval) {
        let pos = self.starts.partition_point(|&s| s <= interval.start);
        self.starts.insert(pos, interval.start);
        self.ends.insert(pos, interval.end);
        self.keys.insert(pos, key);
        self.max_ends.insert(pos, 0);
        self.rebuild_max_ends(pos);
    }

    /// Returns a reference to the key of every stored interval overlapping
    /// the query.
    #[must_use]
    pub fn query(&self, query: Interval) -> Vec<&K> {
        let mut hits = Vec::new();
        let mut i = self.starts.partition_point(|&s| s < query.end);
        while i > 0 {
            i -= 1;
            if query.start >= self.ends[i] {
                // no overlap here; stop once nothing earlier can reach us
                if query.start >= self.max_ends[i] {
                    break;
                }
            } else {
                hits.push(&self.keys[i]);
            }
        }
        hits
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Recomputes the running max-end array from `from` onward.
    fn rebuild_max_ends(&mut self, from: usize) {
        let mut max = if from == 0 { 0 } else { self.max_ends[from - 1] };
        for i in from..self.ends.len() {
            max = max.max(self.ends[i]);
            self.max_ends[i] = max;
        }
    }
}
