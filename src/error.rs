use std::error::Error as StdError;

/// Custom Result type for tabin operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the tabin library, encompassing all possible error
/// cases that can occur while building, persisting, or querying a binning
/// index, or while encoding/decoding typed binary values.
///
/// No error in this crate is transient or retried; every variant indicates a
/// programming or data-integrity problem surfaced to the caller synchronously.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed on-disk data: bad magic number, unknown type tag, bad header field
    #[error("Format error: {0}")]
    FormatError(#[from] FormatError),

    /// Features or sequences presented out of the required sort order during a build
    #[error("Ordering error: {0}")]
    OrderingError(#[from] OrderingError),

    /// Declared lengths exceed the bytes actually available on read
    #[error("Truncated data: {0}")]
    TruncationError(#[from] TruncationError),

    /// Coordinate or byte-offset ranges that violate construction invariants
    #[error("Range error: {0}")]
    RangeError(#[from] RangeError),

    /// Errors from the compression strategy layer
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// UTF-8 conversion errors
    #[error("Error with UTF8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Conversion errors from anyhow errors
    #[cfg(feature = "anyhow")]
    #[error("Generic error: {0}")]
    AnyhowError(#[from] anyhow::Error),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    GenericError(#[from] Box<dyn StdError + Send + Sync>),
}

/// Errors raised by malformed binary data or invalid header fields.
///
/// These are always fatal and never retried.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// The magic number at the start of an index stream does not match
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid magic number: {0:#x}")]
    InvalidMagicNumber(u32),

    /// A typed-value descriptor carried a type tag this codec does not know
    #[error("Unknown type tag in descriptor: {0}")]
    UnknownTypeTag(u8),

    /// The same bin number appeared more than once for a single sequence
    #[error("Bin {0} appears more than once for a single sequence")]
    DuplicateBin(u32),

    /// A header field held a value outside its legal range (negative count,
    /// out-of-range comment character)
    #[error("Header field {field} has invalid value {value}")]
    InvalidField { field: &'static str, value: i64 },

    /// The sequence name block did not decompose into the declared number of names
    #[error("Sequence name block is longer than its declared contents")]
    MalformedNameBlock,

    /// An index was constructed with mismatched name and content lists
    #[error("Sequence name count ({names}) does not match content count ({contents})")]
    SequenceCountMismatch { names: usize, contents: usize },
}

/// Errors raised when features or sequences are presented out of sort order
/// during index construction.
///
/// These abort the build: an index built from unsorted input would silently
/// drop coverage.
#[derive(thiserror::Error, Debug)]
pub enum OrderingError {
    /// A feature on the current sequence started before the previous feature
    #[error(
        "Features out of order on sequence {sequence}: saw start {current} after start {previous}"
    )]
    FeatureOutOfOrder {
        sequence: String,
        previous: u32,
        current: u32,
    },

    /// A sequence reappeared after features for a later sequence were added
    #[error("Sequence {0} reappeared after it was already closed out")]
    SequenceRevisited(String),

    /// A feature's file offset went backwards relative to the pending feature
    #[error("File offset {current} precedes the pending feature offset {previous}")]
    OffsetOutOfOrder { previous: u64, current: u64 },
}

/// Errors raised when a declared length promises more bytes than are available.
#[derive(thiserror::Error, Debug)]
pub enum TruncationError {
    /// A fixed-size field could not be fully read
    ///
    /// The parameter names the field that was being read
    #[error("Stream ended while reading {0}")]
    TruncatedField(&'static str),

    /// The typed-value decoder was asked to read past the end of its buffer
    #[error("End of data at byte position {position}: needed {needed} more bytes")]
    EndOfData { position: usize, needed: usize },
}

/// Errors raised by invalid coordinate or byte-offset ranges.
#[derive(thiserror::Error, Debug)]
pub enum RangeError {
    /// A chunk's start offset was not strictly less than its end offset
    #[error("Chunk start offset ({start}) is not strictly less than end offset ({end})")]
    EmptyChunk { start: u64, end: u64 },

    /// A genomic position exceeded the addressable coordinate space of the binning scheme
    #[error("Position {position} exceeds the maximum indexable coordinate {max}")]
    PositionOutOfRange { position: u64, max: u64 },

    /// An integer collides with the missing-value sentinel of its requested width
    #[error("Integer {0} is reserved as the missing-value sentinel at the requested width")]
    UnencodableInteger(i32),
}

/// Errors from the compression strategy layer.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// The selected codec variant is not available in this build
    #[error("Compression codec is unavailable")]
    Unavailable,
}

/// Trait for converting arbitrary errors into `Error`
pub trait IntoTabinError {
    fn into_tabin_error(self) -> Error;
}

// Implement conversion for any std error
impl<E> IntoTabinError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_tabin_error(self) -> Error {
        Error::GenericError(Box::new(self))
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_format_error_invalid_magic() {
        let error = Error::FormatError(FormatError::InvalidMagicNumber(0xDEAD_BEEF));
        let error_str = format!("{error}");
        assert!(error_str.contains("0xdeadbeef"));
    }

    #[test]
    fn test_format_error_unknown_type_tag() {
        let error = FormatError::UnknownTypeTag(9);
        assert!(format!("{error}").contains('9'));
    }

    #[test]
    fn test_ordering_error_feature_out_of_order() {
        let error = OrderingError::FeatureOutOfOrder {
            sequence: "chr1".to_string(),
            previous: 500,
            current: 100,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("chr1"));
        assert!(error_str.contains("500"));
        assert!(error_str.contains("100"));
    }

    #[test]
    fn test_truncation_error_end_of_data() {
        let error = TruncationError::EndOfData {
            position: 12,
            needed: 4,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("12"));
        assert!(error_str.contains('4'));
    }

    #[test]
    fn test_range_error_empty_chunk() {
        let error = RangeError::EmptyChunk { start: 10, end: 10 };
        assert!(format!("{error}").contains("10"));
    }

    #[test]
    fn test_error_from_sub_enums() {
        let error: Error = FormatError::MalformedNameBlock.into();
        assert!(matches!(error, Error::FormatError(_)));

        let error: Error = OrderingError::SequenceRevisited("chr2".to_string()).into();
        assert!(matches!(error, Error::OrderingError(_)));

        let error: Error = TruncationError::TruncatedField("chunk list").into();
        assert!(matches!(error, Error::TruncationError(_)));

        let error: Error = RangeError::EmptyChunk { start: 1, end: 1 }.into();
        assert!(matches!(error, Error::RangeError(_)));

        let error: Error = CodecError::Unavailable.into();
        assert!(matches!(error, Error::CodecError(_)));
    }

    #[test]
    fn test_into_tabin_error() {
        let io = std::io::Error::other("boom");
        let error = io.into_tabin_error();
        assert!(matches!(error, Error::GenericError(_)));
    }
}
