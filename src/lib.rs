//! # tabin
//!
//! Random-access binning indexes and compact typed value encoding for
//! coordinate-sorted genomic data files.
//!
//! Two independent subsystems share this crate:
//!
//! 1. The **binning index**: a hierarchical bin partition plus a linear
//!    index over each sequence, built in one pass over sorted features and
//!    persisted to a versioned little-endian layout. A reader loads the
//!    index and asks [`PersistedIndex::blocks_for`] for the byte ranges of
//!    the data file worth scanning for a query interval.
//! 2. The **typed value codec**: minimal-width integers, floats, and
//!    strings behind one-byte descriptors, with explicit missing-value
//!    sentinels that survive round trips positionally.

pub mod binning;
pub mod compress;
pub mod error;
pub mod index;
pub mod overlap;
pub mod source;
pub mod typed;

pub use compress::Codec;
pub use error::{Error, Result};
pub use index::{
    index_path_for, Bin, BinningIndexContent, Block, Chunk, FormatSpec, IndexBuilder,
    LinearIndex, PersistedIndex,
};
pub use overlap::{Interval, OverlapDetector};
pub use source::{ByteSource, FileSource, InMemoryDictionary, MmapSource, SequenceDictionary};
pub use typed::{Decoder, Encoder, Type, Value};

/// Magic number opening every persisted index stream
pub const INDEX_MAGIC: [u8; 4] = *b"TBI\x01";

/// Conventional file extension for persisted indexes
pub const INDEX_EXTENSION: &str = "tbi";
