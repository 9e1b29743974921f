//! Hierarchical binning scheme for coordinate-sorted interval data
//!
//! This module implements the fixed six-level binning convention shared by the
//! common genomic binary index formats. A sequence's coordinate space (at most
//! 512 Mbp) is partitioned into a hierarchy of bins, each level eight times
//! coarser than the one below it. A feature is assigned to the finest bin that
//! fully contains it; a query range maps to the set of bins on every level
//! that could hold an overlapping feature.
//!
//! The level offsets and shift constants below are a closed, versioned table.
//! They must match the established convention bit-for-bit: any deviation
//! breaks compatibility with indexes produced by other tools.

/// Shift of the finest binning level (16 KiB spans)
pub const MIN_SHIFT: u32 = 14;

/// Shift between adjacent levels (each level is 8x coarser)
pub const LEVEL_SHIFT: u32 = 3;

/// First bin number of each level, coarsest to finest
pub const LEVEL_STARTS: [u32; 6] = [0, 1, 9, 73, 585, 4681];

/// Total number of bins addressable by the scheme
pub const MAX_BINS: u32 = ((1 << 18) - 1) / 7 + 1;

/// One past the largest indexable 0-based coordinate (512 Mbp)
pub const MAX_COORDINATE: u32 = 1 << 29;

/// Width of one linear-index window
pub const WINDOW_SIZE: u32 = 1 << MIN_SHIFT;

/// Returns the finest bin fully containing the 0-based half-open range
/// `[beg, end)`.
///
/// A range that spans a level boundary is promoted to the next coarser level
/// that fully contains it. Identical inputs always yield identical bins.
///
/// Zero-length ranges are treated as covering a single position at `beg`.
#[must_use]
pub fn bin_for(beg: u32, end: u32) -> u32 {
    let beg = beg.min(MAX_COORDINATE - 1);
    // convert to an inclusive end; zero-length ranges cover one position
    let end = end.max(beg + 1).min(MAX_COORDINATE) - 1;

    if beg >> 14 == end >> 14 {
        LEVEL_STARTS[5] + (beg >> 14)
    } else if beg >> 17 == end >> 17 {
        LEVEL_STARTS[4] + (beg >> 17)
    } else if beg >> 20 == end >> 20 {
        LEVEL_STARTS[3] + (beg >> 20)
    } else if beg >> 23 == end >> 23 {
        LEVEL_STARTS[2] + (beg >> 23)
    } else if beg >> 26 == end >> 26 {
        LEVEL_STARTS[1] + (beg >> 26)
    } else {
        LEVEL_STARTS[0]
    }
}

/// Returns every bin, across all levels, that could contain a feature
/// overlapping the 0-based half-open query range `[beg, end)`.
///
/// The result is a superset of `{bin_for(f) : f overlaps [beg, end)}`: false
/// positives are allowed, false negatives are not. Chunk contents still need
/// positional checking by the caller.
#[must_use]
pub fn candidate_bins(beg: u32, end: u32) -> Vec<u32> {
    let beg = beg.min(MAX_COORDINATE - 1);
    let end = end.max(beg + 1).min(MAX_COORDINATE) - 1;

    let mut bins = Vec::with_capacity(LEVEL_STARTS.len());
    bins.push(0);
    for (level, &offset) in LEVEL_STARTS.iter().enumerate().skip(1) {
        let shift = MIN_SHIFT + LEVEL_SHIFT * (LEVEL_STARTS.len() - 1 - level) as u32;
        for k in (offset + (beg >> shift))..=(offset + (end >> shift)) {
            bins.push(k);
        }
    }
    bins
}

/// Returns the linear-index window containing the 0-based position `pos`.
#[must_use]
pub fn window_for(pos: u32) -> usize {
    (pos >> MIN_SHIFT) as usize
}
