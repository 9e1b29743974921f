//! Hierarchical binning index over coordinate-sorted features
//!
//! Three layers: [`content`] holds the in-memory per-sequence structures,
//! [`builder`] constructs them from a single pass over sorted features, and
//! [`persist`] serializes the finished index to the versioned binary layout.

pub mod builder;
pub mod content;
pub mod persist;

pub use builder::IndexBuilder;
pub use content::{Bin, BinList, BinningIndexContent, Chunk, LinearIndex};
pub use persist::{index_path_for, Block, FormatSpec, PersistedIndex};
