//! In-memory representation of one sequence's index content
//!
//! A [`BinningIndexContent`] aggregates the sparse bin list and the linear
//! index for a single reference sequence. It is created once when the index
//! builder advances past a sequence and is immutable afterwards, so concurrent
//! read-only queries need no locking.

use crate::binning;
use crate::error::{FormatError, RangeError, Result};

/// A contiguous byte-offset range `[start, end)` in the underlying compressed
/// container, believed to contain one or more features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Chunk {
    start: u64,
    end: u64,
}
impl Chunk {
    /// Creates a chunk, enforcing that the start offset is strictly less than
    /// the end offset.
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start >= end {
            return Err(RangeError::EmptyChunk { start, end }.into());
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false // start < end is a construction invariant
    }

    /// Extends this chunk's end offset. Used when coalescing adjacent chunks
    /// during construction.
    pub(crate) fn extend_to(&mut self, end: u64) {
        debug_assert!(end >= self.end);
        self.end = end;
    }
}

/// One node of the hierarchical partition of a sequence's coordinate space,
/// holding the byte chunks of the features assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    reference: usize,
    number: u32,
    chunks: Vec<Chunk>,
}
impl Bin {
    #[must_use]
    pub fn new(reference: usize, number: u32) -> Self {
        Self {
            reference,
            number,
            chunks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_chunks(reference: usize, number: u32, chunks: Vec<Chunk>) -> Self {
        Self {
            reference,
            number,
            chunks,
        }
    }

    #[must_use]
    pub fn reference(&self) -> usize {
        self.reference
    }

    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Appends a chunk, coalescing it with the last chunk when the two are
    /// adjacent or overlapping. Features arrive coordinate sorted, so the
    /// incoming chunk never starts before the last one.
    pub(crate) fn push_chunk(&mut self, chunk: Chunk) {
        if let Some(last) = self.chunks.last_mut() {
            if last.end() >= chunk.start() {
                last.extend_to(chunk.end());
                return;
            }
        }
        self.chunks.push(chunk);
    }
}

/// A sparse collection of bins keyed by bin number.
///
/// Equality and iteration are independent of the order in which bins were
/// inserted, which makes index equality independent of on-disk bin order.
#[derive(Debug, Clone, Default)]
pub struct BinList {
    bins: Vec<Option<Bin>>,
    occupied: usize,
}
impl BinList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a bin; a bin number that is already present is a format error.
    pub fn insert(&mut self, bin: Bin) -> Result<()> {
        let number = bin.number() as usize;
        if self.bins.len() <= number {
            self.bins.resize_with(number + 1, || None);
        }
        if self.bins[number].is_some() {
            return Err(FormatError::DuplicateBin(bin.number()).into());
        }
        self.bins[number] = Some(bin);
        self.occupied += 1;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, number: u32) -> Option<&Bin> {
        self.bins.get(number as usize).and_then(Option::as_ref)
    }

    /// Iterates occupied bins in ascending bin-number order.
    pub fn iter(&self) -> impl Iterator<Item = &Bin> {
        self.bins.iter().filter_map(Option::as_ref)
    }

    /// Number of occupied bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }
}
impl PartialEq for BinList {
    fn eq(&self, other: &Self) -> bool {
        self.occupied == other.occupied && self.iter().eq(other.iter())
    }
}
impl Eq for BinList {}

/// A per-window array of minimum chunk-start offsets, used to prune candidate
/// bins before chunk fetch.
///
/// `entries[w]` is a lower bound on the file offset of every feature whose
/// range intersects window `w`; it must never overestimate, or true overlaps
/// would be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearIndex {
    reference: usize,
    entries: Vec<u64>,
}
impl LinearIndex {
    #[must_use]
    pub fn new(reference: usize, entries: Vec<u64>) -> Self {
        Self { reference, entries }
    }

    #[must_use]
    pub fn reference(&self) -> usize {
        self.reference
    }

    #[must_use]
    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    /// Returns the minimum file offset that could hold a feature overlapping
    /// a query beginning at 1-based position `start`.
    #[must_use]
    pub fn min_offset(&self, start: u32) -> u64 {
        if self.entries.is_empty() {
            return 0;
        }
        let window = binning::window_for(start.saturating_sub(1));
        self.entries[window.min(self.entries.len() - 1)]
    }
}

/// Per-sequence aggregate of the bin list and linear index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinningIndexContent {
    reference: usize,
    bins: BinList,
    linear_index: LinearIndex,
}
impl BinningIndexContent {
    #[must_use]
    pub fn new(reference: usize, bins: BinList, linear_index: LinearIndex) -> Self {
        Self {
            reference,
            bins,
            linear_index,
        }
    }

    #[must_use]
    pub fn reference(&self) -> usize {
        self.reference
    }

    #[must_use]
    pub fn bins(&self) -> &BinList {
        &self.bins
    }

    #[must_use]
    pub fn linear_index(&self) -> &LinearIndex {
        &self.linear_index
    }

    /// Returns the chunks of every candidate bin for the 1-based inclusive
    /// query range `[start, end]`, pruned by the linear index and sorted by
    /// start offset. Overlapping chunks are not merged; merging byte ranges
    /// is a caller-side optimization.
    #[must_use]
    pub fn chunks_overlapping(&self, start: u32, end: u32) -> Vec<Chunk> {
        let beg = start.saturating_sub(1);
        let min_offset = self.linear_index.min_offset(start);

        let mut chunks = Vec::new();
        for number in binning::candidate_bins(beg, end) {
            if let Some(bin) = self.bins.get(number) {
                for &chunk in bin.chunks() {
                    if chunk.end() > min_offset {
                        chunks.push(chunk);
                    }
                }
            }
        }
        chunks.sort_unstable();
        chunks
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_chunk_rejects_empty_range() {
        assert!(Chunk::new(10, 10).is_err());
        assert!(Chunk::new(11, 10).is_err());
        assert!(Chunk::new(10, 11).is_ok());
    }

    #[test]
    fn test_bin_coalesces_adjacent_chunks() {
        let mut bin = Bin::new(0, 4681);
        bin.push_chunk(Chunk::new(0, 50).unwrap());
        bin.push_chunk(Chunk::new(50, 120).unwrap());
        assert_eq!(bin.chunks(), &[Chunk::new(0, 120).unwrap()]);

        bin.push_chunk(Chunk::new(500, 600).unwrap());
        assert_eq!(bin.chunks().len(), 2);
    }

    #[test]
    fn test_bin_list_rejects_duplicates() {
        let mut bins = BinList::new();
        bins.insert(Bin::new(0, 100)).unwrap();
        assert!(bins.insert(Bin::new(0, 100)).is_err());
        assert_eq!(bins.len(), 1);
    }

    #[test]
    fn test_bin_list_equality_ignores_insert_order() {
        let a_bin = Bin::with_chunks(0, 10, vec![Chunk::new(0, 5).unwrap()]);
        let b_bin = Bin::with_chunks(0, 4681, vec![Chunk::new(5, 9).unwrap()]);

        let mut forward = BinList::new();
        forward.insert(a_bin.clone()).unwrap();
        forward.insert(b_bin.clone()).unwrap();

        let mut backward = BinList::new();
        backward.insert(b_bin).unwrap();
        backward.insert(a_bin).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_linear_index_min_offset() {
        let linear = LinearIndex::new(0, vec![0, 100, 250]);
        assert_eq!(linear.min_offset(1), 0);
        assert_eq!(linear.min_offset(16_385), 100);
        // past the last window: clamped to the final entry
        assert_eq!(linear.min_offset(1_000_000), 250);
    }

    #[test]
    fn test_linear_index_empty() {
        let linear = LinearIndex::new(0, Vec::new());
        assert_eq!(linear.min_offset(123), 0);
    }

    #[test]
    fn test_chunks_overlapping_prunes_by_linear_index() {
        let mut bins = BinList::new();
        // the root bin is a candidate for every query
        bins.insert(Bin::with_chunks(0, 0, vec![Chunk::new(0, 50).unwrap()]))
            .unwrap();
        // a feature in the second window with a later offset
        bins.insert(Bin::with_chunks(0, 4682, vec![Chunk::new(120, 200).unwrap()]))
            .unwrap();
        let linear = LinearIndex::new(0, vec![0, 120]);
        let content = BinningIndexContent::new(0, bins, linear);

        // query inside the second window: the first chunk ends at or before
        // the window's minimum offset and is pruned
        let chunks = content.chunks_overlapping(16_500, 16_600);
        assert!(!chunks.contains(&Chunk::new(0, 50).unwrap()));
        assert!(chunks.contains(&Chunk::new(120, 200).unwrap()));
    }
}
