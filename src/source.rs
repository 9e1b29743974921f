//! Collaborator interfaces supplied by the environment
//!
//! The index core never does file I/O of its own beyond the persistence
//! layer; block-compressed data files are consumed through the [`ByteSource`]
//! capability, and sequence lengths arrive through a [`SequenceDictionary`]
//! used only as a sizing hint.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read as _, Seek as _, SeekFrom};
use std::path::Path;

use memmap2::Mmap;

use crate::error::Result;

/// A seekable, length-aware byte source.
///
/// All reads are synchronous; `read` returning 0 at a position before `len`
/// indicates a truncated source, which callers surface as a truncation error.
#[auto_impl::auto_impl(&mut, Box)]
pub trait ByteSource {
    /// Positions the cursor at an absolute byte offset.
    fn seek(&mut self, position: u64) -> Result<()>;

    /// Reads up to `buf.len()` bytes at the cursor, returning the count read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    /// True once the cursor has reached the end of the source.
    fn is_at_end(&self) -> bool;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`ByteSource`] over a file handle with buffered position tracking.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    length: u64,
    position: u64,
}
impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            file,
            length,
            position: 0,
        })
    }
}
impl ByteSource for FileSource {
    fn seek(&mut self, position: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.file.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn len(&self) -> u64 {
        self.length
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.length
    }
}

/// A memory-mapped [`ByteSource`] for whole-file random access.
pub struct MmapSource {
    map: Mmap,
    position: usize,
}
impl MmapSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map, position: 0 })
    }

    /// Full contents of the mapped file.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.map
    }
}
impl ByteSource for MmapSource {
    fn seek(&mut self, position: u64) -> Result<()> {
        self.position = usize::try_from(position.min(self.map.len() as u64)).unwrap_or(usize::MAX);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = &self.map[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }

    fn len(&self) -> u64 {
        self.map.len() as u64
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.map.len()
    }
}

impl<T: AsRef<[u8]>> ByteSource for Cursor<T> {
    fn seek(&mut self, position: u64) -> Result<()> {
        self.set_position(position);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(std::io::Read::read(self, buf)?)
    }

    fn len(&self) -> u64 {
        self.get_ref().as_ref().len() as u64
    }

    fn is_at_end(&self) -> bool {
        self.position() >= ByteSource::len(self)
    }
}

/// Maps sequence names to total lengths.
///
/// Implementations are consulted only as an optional sizing hint when the
/// index builder preallocates a sequence's linear array; an unknown length is
/// never an error.
#[auto_impl::auto_impl(&, Box)]
pub trait SequenceDictionary {
    fn length_of(&self, sequence: &str) -> Option<u64>;
}

/// A [`SequenceDictionary`] backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDictionary {
    lengths: HashMap<String, u64>,
}
impl InMemoryDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sequence: &str, length: u64) {
        self.lengths.insert(sequence.to_string(), length);
    }
}
impl SequenceDictionary for InMemoryDictionary {
    fn length_of(&self, sequence: &str) -> Option<u64> {
        self.lengths.get(sequence).copied()
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_cursor_source() {
        let mut source = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        assert_eq!(ByteSource::len(&source), 5);
        assert!(!source.is_at_end());

        ByteSource::seek(&mut source, 3).unwrap();
        let mut buf = [0u8; 8];
        let n = ByteSource::read(&mut source, &mut buf).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..n], &[4, 5]);
        assert!(source.is_at_end());
    }

    #[test]
    fn test_file_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();

        let mut source = FileSource::open(tmp.path()).unwrap();
        assert_eq!(source.len(), 10);
        source.seek(5).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(source.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"56789");
        assert!(source.is_at_end());
    }

    #[test]
    fn test_mmap_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"abcdef").unwrap();
        tmp.flush().unwrap();

        let mut source = MmapSource::open(tmp.path()).unwrap();
        assert_eq!(source.as_bytes(), b"abcdef");
        source.seek(2).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"cd");
    }

    #[test]
    fn test_in_memory_dictionary() {
        let mut dict = InMemoryDictionary::new();
        dict.insert("1", 248_956_422);
        assert_eq!(dict.length_of("1"), Some(248_956_422));
        assert_eq!(dict.length_of("unplaced"), None);
    }
}
