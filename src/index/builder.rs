//! Single-pass construction of a binning index from sorted features
//!
//! The builder consumes features in non-decreasing (sequence, start) order
//! together with the byte offset at which each record begins in the
//! underlying compressed container. Because a record's byte extent is only
//! known once the next record's offset (or EOF) is observed, exactly one
//! feature is kept pending: adding a feature finalizes the previous one, and
//! [`IndexBuilder::finalize`] resolves the last one against the EOF offset.
//!
//! The finished index also retains each feature's coordinate extent in an
//! [`OverlapDetector`], so queries answered before (or instead of) persistence
//! are feature-exact rather than bin-approximate. The on-disk layout carries
//! no per-chunk coordinates, so indexes loaded back from disk answer at bin
//! granularity only.
//!
//! Construction is strictly single-writer and sequential; the pending-feature
//! buffer and the sequences-seen set are not safe for concurrent mutation.

use std::collections::HashSet;

use crate::binning::{self, MAX_COORDINATE, WINDOW_SIZE};
use crate::error::{OrderingError, RangeError, Result};
use crate::index::content::{Bin, BinList, BinningIndexContent, Chunk, LinearIndex};
use crate::index::persist::{FormatSpec, PersistedIndex};
use crate::overlap::{Interval, OverlapDetector};
use crate::source::SequenceDictionary;

/// Sentinel for a linear-index window no feature has touched yet.
const UNSET: u64 = u64::MAX;

/// A feature whose chunk end is not yet known.
#[derive(Debug, Clone, Copy)]
struct PendingFeature {
    start: u32,
    end: u32,
    offset: u64,
}

/// Accumulates bins and linear-index entries for a single reference sequence.
///
/// This is the unified, terminology-clarified accumulator: features are
/// processed "from" their record offset "to" the next record's offset.
#[derive(Debug)]
struct ReferenceIndexer {
    reference: usize,
    bins: Vec<Option<Bin>>,
    bin_count: usize,
    linear: Vec<u64>,
    features: Vec<(Interval, Chunk)>,
}
impl ReferenceIndexer {
    fn new(reference: usize, length_hint: Option<u64>) -> Self {
        // preallocate the linear array when the sequence length is known,
        // otherwise grow adaptively as features arrive
        let windows = length_hint
            .map(|len| (len / u64::from(WINDOW_SIZE) + 1) as usize)
            .unwrap_or(0);
        Self {
            reference,
            bins: Vec::new(),
            bin_count: 0,
            linear: vec![UNSET; windows],
            features: Vec::new(),
        }
    }

    /// Folds one finalized feature (1-based inclusive coordinates) into the
    /// bin and linear-index state.
    fn process_feature(&mut self, start: u32, end: u32, chunk: Chunk) -> Result<()> {
        if u64::from(end) > u64::from(MAX_COORDINATE) {
            return Err(RangeError::PositionOutOfRange {
                position: u64::from(end),
                max: u64::from(MAX_COORDINATE),
            }
            .into());
        }
        let beg = start.saturating_sub(1);
        let end = end.max(beg + 1); // zero-length features cover one position

        // the per-feature extent backs feature-exact queries on the built index
        self.features
            .push((Interval::new(u64::from(beg), u64::from(end)), chunk));

        // assign the chunk to the feature's bin
        let number = binning::bin_for(beg, end) as usize;
        if self.bins.len() <= number {
            self.bins.resize_with(number + 1, || None);
        }
        let bin = self.bins[number].get_or_insert_with(|| {
            self.bin_count += 1;
            Bin::new(self.reference, number as u32)
        });
        bin.push_chunk(chunk);

        // fold the record offset into every window the feature touches,
        // taking the pointwise minimum
        let first_window = binning::window_for(beg);
        let last_window = binning::window_for(end - 1);
        if self.linear.len() <= last_window {
            self.linear.resize(last_window + 1, UNSET);
        }
        for window in first_window..=last_window {
            if chunk.start() < self.linear[window] {
                self.linear[window] = chunk.start();
            }
        }
        Ok(())
    }

    /// Closes out the accumulator, producing the sequence's content and its
    /// feature-extent detector, or `None` if no features were indexed.
    fn finish(self) -> Option<(BinningIndexContent, OverlapDetector<Chunk>)> {
        if self.bin_count == 0 {
            return None;
        }

        let mut bins = BinList::new();
        for bin in self.bins.into_iter().flatten() {
            // bin numbers are unique by construction
            bins.insert(bin).ok()?;
        }

        // trim trailing untouched windows, then backfill interior ones with
        // the previous window's offset (still a valid lower bound: untouched
        // windows hold no feature of their own)
        let mut entries = self.linear;
        while entries.last() == Some(&UNSET) {
            entries.pop();
        }
        let mut last_offset = 0;
        for entry in &mut entries {
            if *entry == UNSET {
                *entry = last_offset;
            } else {
                last_offset = *entry;
            }
        }

        let content = BinningIndexContent::new(
            self.reference,
            bins,
            LinearIndex::new(self.reference, entries),
        );
        Some((content, OverlapDetector::build(self.features)))
    }
}

/// Builds a [`PersistedIndex`] from a single pass over sorted features.
///
/// State machine: no sequence → in sequence (per `add_feature`) → done (per
/// `finalize`). Ordering violations abort the build, since an index built
/// from unsorted input would silently drop coverage.
pub struct IndexBuilder {
    format: FormatSpec,
    sequence_names: Vec<String>,
    seen: HashSet<String>,
    contents: Vec<Option<BinningIndexContent>>,
    extents: Vec<Option<OverlapDetector<Chunk>>>,
    current: Option<ReferenceIndexer>,
    pending: Option<PendingFeature>,
    last_start: u32,
    dictionary: Option<Box<dyn SequenceDictionary>>,
}
impl IndexBuilder {
    #[must_use]
    pub fn new(format: FormatSpec) -> Self {
        Self {
            format,
            sequence_names: Vec::new(),
            seen: HashSet::new(),
            contents: Vec::new(),
            extents: Vec::new(),
            current: None,
            pending: None,
            last_start: 0,
            dictionary: None,
        }
    }

    /// Supplies a sequence dictionary used only as a sizing hint for the
    /// per-sequence linear arrays.
    #[must_use]
    pub fn with_dictionary<D: SequenceDictionary + 'static>(
        format: FormatSpec,
        dictionary: D,
    ) -> Self {
        let mut builder = Self::new(format);
        builder.dictionary = Some(Box::new(dictionary));
        builder
    }

    /// Adds one feature with 1-based inclusive coordinates and the byte
    /// offset at which its record starts.
    ///
    /// Finalizes the previously pending feature (its chunk ends where this
    /// record begins) before buffering this one.
    pub fn add_feature(&mut self, sequence: &str, start: u32, end: u32, offset: u64) -> Result<()> {
        let same_sequence = self.sequence_names.last().is_some_and(|name| name == sequence);

        if same_sequence {
            if start < self.last_start {
                return Err(OrderingError::FeatureOutOfOrder {
                    sequence: sequence.to_string(),
                    previous: self.last_start,
                    current: start,
                }
                .into());
            }
        } else if self.seen.contains(sequence) {
            return Err(OrderingError::SequenceRevisited(sequence.to_string()).into());
        }

        self.resolve_pending(offset)?;

        if !same_sequence {
            self.advance_to_sequence(sequence);
        }

        self.pending = Some(PendingFeature { start, end, offset });
        self.last_start = start;
        Ok(())
    }

    /// Finalizes the last pending feature against the end-of-file offset,
    /// flushes the last sequence, and produces the finished index.
    pub fn finalize(mut self, eof_offset: u64) -> Result<PersistedIndex> {
        self.resolve_pending(eof_offset)?;
        self.flush_current();
        PersistedIndex::with_feature_extents(
            self.format,
            self.sequence_names,
            self.contents,
            self.extents,
        )
    }

    /// Assigns the pending feature's chunk end and folds it into the current
    /// sequence's accumulator.
    fn resolve_pending(&mut self, end_offset: u64) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        if end_offset < pending.offset {
            return Err(OrderingError::OffsetOutOfOrder {
                previous: pending.offset,
                current: end_offset,
            }
            .into());
        }
        let chunk = Chunk::new(pending.offset, end_offset)?;
        if let Some(indexer) = self.current.as_mut() {
            indexer.process_feature(pending.start, pending.end, chunk)?;
        }
        Ok(())
    }

    /// Closes out the prior sequence (if any) and starts accumulating the
    /// named one.
    fn advance_to_sequence(&mut self, sequence: &str) {
        self.flush_current();

        let reference = self.sequence_names.len();
        let length_hint = self
            .dictionary
            .as_ref()
            .and_then(|dict| dict.length_of(sequence));
        self.seen.insert(sequence.to_string());
        self.sequence_names.push(sequence.to_string());
        self.current = Some(ReferenceIndexer::new(reference, length_hint));
        self.last_start = 0;
    }

    fn flush_current(&mut self) {
        if let Some(indexer) = self.current.take() {
            match indexer.finish() {
                Some((content, detector)) => {
                    self.contents.push(Some(content));
                    self.extents.push(Some(detector));
                }
                None => {
                    self.contents.push(None);
                    self.extents.push(None);
                }
            }
        }
    }
}
