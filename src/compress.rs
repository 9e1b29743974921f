//! Compression strategy for persisted index streams
//!
//! The codec is an explicit, configuration-selected strategy rather than a
//! runtime probe for an optional library: callers pick a variant up front, and
//! a build or deployment without compression support selects
//! [`Codec::Unavailable`], which fails loudly instead of silently writing
//! uncompressed data under a compressed extension.

use std::io::{Read, Write};

use crate::error::{CodecError, Result};

/// Default zstd compression level (0 selects the library default)
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 0;

/// Stream compression strategy applied around the raw index layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// zstd stream compression at the given level
    Zstd { level: i32 },
    /// No compression; bytes pass through unchanged
    Passthrough,
    /// Compression was requested but no codec is available
    Unavailable,
}
impl Codec {
    /// Compresses everything from `reader` into `writer`.
    pub fn compress<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<()> {
        match self {
            Self::Zstd { level } => {
                zstd::stream::copy_encode(reader, writer, *level)?;
                Ok(())
            }
            Self::Passthrough => {
                let mut reader = reader;
                let mut writer = writer;
                std::io::copy(&mut reader, &mut writer)?;
                Ok(())
            }
            Self::Unavailable => Err(CodecError::Unavailable.into()),
        }
    }

    /// Decompresses everything from `reader` into `writer`.
    pub fn decompress<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<()> {
        match self {
            Self::Zstd { .. } => {
                zstd::stream::copy_decode(reader, writer)?;
                Ok(())
            }
            Self::Passthrough => {
                let mut reader = reader;
                let mut writer = writer;
                std::io::copy(&mut reader, &mut writer)?;
                Ok(())
            }
            Self::Unavailable => Err(CodecError::Unavailable.into()),
        }
    }
}
impl Default for Codec {
    fn default() -> Self {
        Self::Zstd {
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_zstd_round_trip() {
        let input = b"sequence name table and bins".repeat(64);
        let mut compressed = Vec::new();
        Codec::default()
            .compress(input.as_slice(), &mut compressed)
            .unwrap();
        assert!(compressed.len() < input.len());

        let mut output = Vec::new();
        Codec::default()
            .decompress(compressed.as_slice(), &mut output)
            .unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_passthrough_is_identity() {
        let input = b"raw bytes";
        let mut output = Vec::new();
        Codec::Passthrough
            .compress(input.as_slice(), &mut output)
            .unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_unavailable_fails() {
        let mut sink = Vec::new();
        let err = Codec::Unavailable
            .compress(&b"x"[..], &mut sink)
            .unwrap_err();
        assert!(matches!(err, crate::Error::CodecError(_)));
    }
}
