//! Binary serialization of the binning index
//!
//! The layout is exact and versioned: a magic number, format metadata, a
//! NUL-terminated sequence-name block, then per sequence the bin/chunk lists
//! and the linear index. Every integer field is little-endian regardless of
//! host architecture. Bins are written in ascending bin-number order here, but
//! readers must not depend on any bin order; equality is defined over the
//! reconstructed keyed structures.
//!
//! This component produces and consumes the raw field stream only. Whole-file
//! compression is applied by the [`Codec`](crate::compress::Codec) strategy in
//! the path-level helpers.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::compress::Codec;
use crate::error::{FormatError, Result, TruncationError};
use crate::index::content::{Bin, BinList, BinningIndexContent, Chunk, LinearIndex};
use crate::overlap::{Interval, OverlapDetector};
use crate::source::ByteSource;
use crate::{INDEX_EXTENSION, INDEX_MAGIC};

/// Column mapping and parsing metadata for the indexed file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    /// Format flags; bit 16 marks 0-based half-open coordinates
    pub flags: i32,
    pub sequence_column: i32,
    pub start_column: i32,
    /// 0 = no explicit end column
    pub end_column: i32,
    pub comment_char: char,
    pub header_lines_to_skip: i32,
}
impl FormatSpec {
    /// Metadata for VCF: 1-based, end implied by the record.
    #[must_use]
    pub fn vcf() -> Self {
        Self {
            flags: 2,
            sequence_column: 1,
            start_column: 2,
            end_column: 0,
            comment_char: '#',
            header_lines_to_skip: 0,
        }
    }

    /// Metadata for BED: 0-based half-open with an explicit end column.
    #[must_use]
    pub fn bed() -> Self {
        Self {
            flags: 0x10000,
            sequence_column: 1,
            start_column: 2,
            end_column: 3,
            comment_char: '#',
            header_lines_to_skip: 0,
        }
    }

    /// Metadata for GFF: 1-based inclusive with explicit start/end columns.
    #[must_use]
    pub fn gff() -> Self {
        Self {
            flags: 0,
            sequence_column: 1,
            start_column: 4,
            end_column: 5,
            comment_char: '#',
            header_lines_to_skip: 0,
        }
    }
}

/// A byte range handed to the external file-reading layer: (offset, length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    start: u64,
    length: u64,
}
impl Block {
    #[must_use]
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Fetches this block's bytes from the underlying data file.
    pub fn read_from<S: ByteSource>(&self, source: &mut S) -> Result<Vec<u8>> {
        source.seek(self.start)?;
        let mut buf = vec![0u8; self.length as usize];
        let mut filled = 0;
        while filled < buf.len() {
            let n = source.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(TruncationError::TruncatedField("block bytes").into());
            }
            filled += n;
        }
        Ok(buf)
    }
}

/// A complete, immutable binning index: format metadata, sequence names in
/// first-seen order, and per-sequence content (absent for sequences with no
/// indexed features).
///
/// Once constructed the index never mutates, so concurrent read-only queries
/// need no locking.
///
/// An index freshly produced by the builder also carries each feature's
/// coordinate extent and answers [`blocks_for`](Self::blocks_for) exactly; an
/// index loaded from disk has only bin-level granularity and answers with the
/// usual over-approximation (false positives possible, false negatives never).
pub struct PersistedIndex {
    format: FormatSpec,
    sequence_names: Vec<String>,
    contents: Vec<Option<BinningIndexContent>>,
    extents: Vec<Option<OverlapDetector<Chunk>>>,
}
impl PersistedIndex {
    /// Assembles an index from per-sequence content, one entry per name.
    pub fn new(
        format: FormatSpec,
        sequence_names: Vec<String>,
        contents: Vec<Option<BinningIndexContent>>,
    ) -> Result<Self> {
        let extents = (0..contents.len()).map(|_| None).collect();
        Self::with_feature_extents(format, sequence_names, contents, extents)
    }

    /// Builder-side constructor carrying per-feature extents for exact
    /// querying before persistence.
    pub(crate) fn with_feature_extents(
        format: FormatSpec,
        sequence_names: Vec<String>,
        contents: Vec<Option<BinningIndexContent>>,
        extents: Vec<Option<OverlapDetector<Chunk>>>,
    ) -> Result<Self> {
        if sequence_names.len() != contents.len() {
            return Err(FormatError::SequenceCountMismatch {
                names: sequence_names.len(),
                contents: contents.len(),
            }
            .into());
        }
        debug_assert_eq!(contents.len(), extents.len());
        Ok(Self {
            format,
            sequence_names,
            contents,
            extents,
        })
    }

    #[must_use]
    pub fn format(&self) -> &FormatSpec {
        &self.format
    }

    #[must_use]
    pub fn sequence_names(&self) -> &[String] {
        &self.sequence_names
    }

    #[must_use]
    pub fn contains_sequence(&self, sequence: &str) -> bool {
        self.sequence_names.iter().any(|name| name == sequence)
    }

    /// Returns the byte ranges that can contain features overlapping the
    /// 1-based inclusive range `[start, end]` on the named sequence.
    ///
    /// An unknown sequence or one with no stored content yields an empty list,
    /// not an error. Overlapping blocks are not merged; merging byte ranges is
    /// a caller-side optimization.
    #[must_use]
    pub fn blocks_for(&self, sequence: &str, start: u32, end: u32) -> Vec<Block> {
        let Some(index) = self
            .sequence_names
            .iter()
            .position(|name| name == sequence)
        else {
            return Vec::new();
        };
        let Some(content) = self.contents[index].as_ref() else {
            return Vec::new();
        };

        let chunks = match self.extents[index].as_ref() {
            Some(detector) => {
                // convert 1-based inclusive to 0-based half-open
                let query =
                    Interval::new(u64::from(start.saturating_sub(1)), u64::from(end));
                let mut chunks: Vec<Chunk> =
                    detector.query(query).into_iter().copied().collect();
                chunks.sort_unstable();
                chunks.dedup();
                chunks
            }
            None => content.chunks_overlapping(start, end),
        };

        chunks
            .into_iter()
            .map(|chunk| Block::new(chunk.start(), chunk.len()))
            .collect()
    }

    /// Writes the raw index layout to `writer`.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&INDEX_MAGIC)?;
        writer.write_i32::<LittleEndian>(self.sequence_names.len() as i32)?;
        writer.write_i32::<LittleEndian>(self.format.flags)?;
        writer.write_i32::<LittleEndian>(self.format.sequence_column)?;
        writer.write_i32::<LittleEndian>(self.format.start_column)?;
        writer.write_i32::<LittleEndian>(self.format.end_column)?;
        writer.write_i32::<LittleEndian>(self.format.comment_char as i32)?;
        writer.write_i32::<LittleEndian>(self.format.header_lines_to_skip)?;

        let mut name_block = Vec::new();
        for name in &self.sequence_names {
            name_block.extend_from_slice(name.as_bytes());
            name_block.push(0);
        }
        writer.write_i32::<LittleEndian>(name_block.len() as i32)?;
        writer.write_all(&name_block)?;

        for content in &self.contents {
            let Some(content) = content else {
                writer.write_i32::<LittleEndian>(0)?; // no bins
                writer.write_i32::<LittleEndian>(0)?; // no linear entries
                continue;
            };
            writer.write_i32::<LittleEndian>(content.bins().len() as i32)?;
            for bin in content.bins().iter() {
                writer.write_i32::<LittleEndian>(bin.number() as i32)?;
                writer.write_i32::<LittleEndian>(bin.chunks().len() as i32)?;
                for chunk in bin.chunks() {
                    writer.write_u64::<LittleEndian>(chunk.start())?;
                    writer.write_u64::<LittleEndian>(chunk.end())?;
                }
            }
            let entries = content.linear_index().entries();
            writer.write_i32::<LittleEndian>(entries.len() as i32)?;
            for &entry in entries {
                writer.write_u64::<LittleEndian>(entry)?;
            }
        }
        Ok(())
    }

    /// Reads the raw index layout from `reader`.
    ///
    /// Fails with a format error on a bad magic number or malformed header
    /// field, and with a truncation error when a declared length promises more
    /// bytes than the stream provides.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        field("magic number", reader.read_exact(&mut magic))?;
        if magic != INDEX_MAGIC {
            return Err(FormatError::InvalidMagicNumber(u32::from_le_bytes(magic)).into());
        }

        let num_sequences = read_count(reader, "sequence count")?;
        let flags = field("format flags", reader.read_i32::<LittleEndian>())?;
        let sequence_column = field("sequence column", reader.read_i32::<LittleEndian>())?;
        let start_column = field("start column", reader.read_i32::<LittleEndian>())?;
        let end_column = field("end column", reader.read_i32::<LittleEndian>())?;
        let comment_raw = field("comment character", reader.read_i32::<LittleEndian>())?;
        let comment_char = u32::try_from(comment_raw)
            .ok()
            .and_then(char::from_u32)
            .ok_or(FormatError::InvalidField {
                field: "comment character",
                value: i64::from(comment_raw),
            })?;
        let header_lines_to_skip =
            field("header line count", reader.read_i32::<LittleEndian>())?;

        let name_block_size = read_count(reader, "name block size")?;
        let mut name_block = vec![0u8; name_block_size];
        field("sequence name block", reader.read_exact(&mut name_block))?;

        let mut sequence_names = Vec::with_capacity(num_sequences);
        let mut rest = name_block.as_slice();
        for _ in 0..num_sequences {
            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or(FormatError::MalformedNameBlock)?;
            sequence_names.push(std::str::from_utf8(&rest[..nul])?.to_string());
            rest = &rest[nul + 1..];
        }
        if !rest.is_empty() {
            return Err(FormatError::MalformedNameBlock.into());
        }

        let mut contents = Vec::with_capacity(num_sequences);
        for reference in 0..num_sequences {
            let num_bins = read_count(reader, "bin count")?;
            let mut bins = BinList::new();
            for _ in 0..num_bins {
                let number = field("bin number", reader.read_i32::<LittleEndian>())?;
                let number = u32::try_from(number).map_err(|_| FormatError::InvalidField {
                    field: "bin number",
                    value: i64::from(number),
                })?;
                let num_chunks = read_count(reader, "chunk count")?;
                let mut chunks = Vec::with_capacity(num_chunks);
                for _ in 0..num_chunks {
                    let start = field("chunk start", reader.read_u64::<LittleEndian>())?;
                    let end = field("chunk end", reader.read_u64::<LittleEndian>())?;
                    chunks.push(Chunk::new(start, end)?);
                }
                bins.insert(Bin::with_chunks(reference, number, chunks))?;
            }

            let num_entries = read_count(reader, "linear index length")?;
            let mut entries = Vec::with_capacity(num_entries);
            for _ in 0..num_entries {
                entries.push(field("linear index entry", reader.read_u64::<LittleEndian>())?);
            }

            if bins.is_empty() && entries.is_empty() {
                contents.push(None);
            } else {
                contents.push(Some(BinningIndexContent::new(
                    reference,
                    bins,
                    LinearIndex::new(reference, entries),
                )));
            }
        }

        Self::new(
            FormatSpec {
                flags,
                sequence_column,
                start_column,
                end_column,
                comment_char,
                header_lines_to_skip,
            },
            sequence_names,
            contents,
        )
    }

    /// Writes the index to a file, wrapped by the given compression codec.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P, codec: Codec) -> Result<()> {
        let mut raw = Vec::new();
        self.write(&mut raw)?;
        let mut writer = BufWriter::new(File::create(path)?);
        codec.compress(raw.as_slice(), &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads an index from a file written by [`write_to_path`](Self::write_to_path).
    pub fn read_from_path<P: AsRef<Path>>(path: P, codec: Codec) -> Result<Self> {
        let mut raw = Vec::new();
        codec.decompress(BufReader::new(File::open(path)?), &mut raw)?;
        Self::read(&mut raw.as_slice())
    }
}
impl PartialEq for PersistedIndex {
    /// Equality covers format metadata, sequence names, and per-sequence
    /// content; feature extents are a builder-side refinement and do not
    /// participate.
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
            && self.sequence_names == other.sequence_names
            && self.contents == other.contents
    }
}
impl Eq for PersistedIndex {}
impl std::fmt::Debug for PersistedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedIndex")
            .field("format", &self.format)
            .field("sequence_names", &self.sequence_names)
            .field("contents", &self.contents)
            .finish_non_exhaustive()
    }
}

/// Conventional index path for a data file: the fixed suffix appended to the
/// full file name.
#[must_use]
pub fn index_path_for<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut name = path.as_ref().as_os_str().to_os_string();
    name.push(".");
    name.push(INDEX_EXTENSION);
    PathBuf::from(name)
}

/// Maps an unexpected end of stream while reading the named field to a
/// truncation error.
fn field<T>(name: &'static str, result: io::Result<T>) -> Result<T> {
    result.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            TruncationError::TruncatedField(name).into()
        } else {
            e.into()
        }
    })
}

/// Reads a declared count, rejecting negative values.
fn read_count<R: Read>(reader: &mut R, name: &'static str) -> Result<usize> {
    let value = field(name, reader.read_i32::<LittleEndian>())?;
    usize::try_from(value).map_err(|_| {
        FormatError::InvalidField {
            field: name,
            value: i64::from(value),
        }
        .into()
    })
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::index::builder::IndexBuilder;

    fn small_index() -> PersistedIndex {
        let mut builder = IndexBuilder::new(FormatSpec::vcf());
        builder.add_feature("1", 100, 200, 0).unwrap();
        builder.add_feature("1", 300, 400, 50).unwrap();
        builder.add_feature("1", 10_000, 10_100, 120).unwrap();
        builder.finalize(200).unwrap()
    }

    fn multi_sequence_index() -> PersistedIndex {
        let mut builder = IndexBuilder::new(FormatSpec::bed());
        builder.add_feature("1", 1, 5_000, 0).unwrap();
        builder.add_feature("1", 100_000, 150_000, 400).unwrap();
        builder.add_feature("2", 50, 60, 900).unwrap();
        builder.add_feature("10", 1_000_000, 2_000_000, 1_300).unwrap();
        builder.finalize(2_000).unwrap()
    }

    #[test]
    fn test_round_trip_small() {
        let index = small_index();
        let mut buf = Vec::new();
        index.write(&mut buf).unwrap();
        let loaded = PersistedIndex::read(&mut buf.as_slice()).unwrap();
        assert_eq!(index, loaded);
    }

    #[test]
    fn test_round_trip_multi_sequence() {
        let index = multi_sequence_index();
        let mut buf = Vec::new();
        index.write(&mut buf).unwrap();
        let loaded = PersistedIndex::read(&mut buf.as_slice()).unwrap();
        assert_eq!(index, loaded);
        assert_eq!(loaded.sequence_names(), &["1", "2", "10"]);
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let mut buf = Vec::new();
        small_index().write(&mut buf).unwrap();
        buf[0] = b'X';
        let err = PersistedIndex::read(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, crate::Error::FormatError(_)));
    }

    #[test]
    fn test_read_rejects_truncated_stream() {
        let mut buf = Vec::new();
        small_index().write(&mut buf).unwrap();
        for cut in [2, 10, 30, buf.len() - 4] {
            let err = PersistedIndex::read(&mut &buf[..cut]).unwrap_err();
            assert!(
                matches!(err, crate::Error::TruncationError(_)),
                "cut at {cut} gave {err}"
            );
        }
    }

    #[test]
    fn test_blocks_for_unknown_sequence_is_empty() {
        let index = small_index();
        assert!(index.blocks_for("MT", 1, 1_000_000).is_empty());
    }

    #[test]
    fn test_loaded_index_never_drops_true_overlaps() {
        // bin-level answers may include extra blocks but must include every
        // feature that overlaps the query
        let index = multi_sequence_index();
        let mut buf = Vec::new();
        index.write(&mut buf).unwrap();
        let loaded = PersistedIndex::read(&mut buf.as_slice()).unwrap();

        let blocks = loaded.blocks_for("1", 120_000, 130_000);
        assert!(blocks
            .iter()
            .any(|b| b.start() <= 400 && 400 < b.start() + b.length()));
    }

    #[test]
    fn test_path_round_trip_with_compression() {
        let dir = tempfile::tempdir().unwrap();
        let path = index_path_for(dir.path().join("calls.vcf"));
        assert!(path.to_string_lossy().ends_with("calls.vcf.tbi"));

        let index = multi_sequence_index();
        for codec in [Codec::default(), Codec::Passthrough] {
            index.write_to_path(&path, codec).unwrap();
            let loaded = PersistedIndex::read_from_path(&path, codec).unwrap();
            assert_eq!(index, loaded);
        }
    }

    #[test]
    fn test_block_read_from_source() {
        let mut source = std::io::Cursor::new(b"0123456789".to_vec());
        let block = Block::new(3, 4);
        assert_eq!(block.read_from(&mut source).unwrap(), b"3456");

        // a block past the end of the source is a truncation error
        let short = Block::new(8, 5);
        let err = short.read_from(&mut source).unwrap_err();
        assert!(matches!(err, crate::Error::TruncationError(_)));
    }

    #[test]
    fn test_format_presets() {
        assert_eq!(FormatSpec::vcf().start_column, 2);
        assert_eq!(FormatSpec::bed().flags, 0x10000);
        assert_eq!(FormatSpec::gff().end_column, 5);
    }

    #[test]
    fn test_sequence_count_mismatch_rejected() {
        let err = PersistedIndex::new(FormatSpec::vcf(), vec!["1".to_string()], Vec::new())
            .unwrap_err();
        assert!(matches!(err, crate::Error::FormatError(_)));
    }
}
