//! Compact typed binary value codec
//!
//! Scalars and vectors of integers, floats, and strings are serialized behind
//! a one-byte descriptor packing the element type and the arity. Integer
//! vectors use the minimal signed width that holds every present value;
//! missing values are stored as a reserved sentinel bit pattern per type, so
//! vectors keep their positional alignment. Decoding reproduces the exact
//! missing/present pattern that was encoded.
//!
//! Encoder and decoder instances hold only a cursor over a caller-supplied
//! buffer; they are stateless between values and safe to use one per thread.

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::Encoder;

use crate::error::{FormatError, Result};

/// Largest arity that fits inline in the descriptor byte
pub const MAX_INLINE_ARITY: usize = 14;

/// Arity field value marking an escaped, separately encoded count
pub const OVERFLOW_ARITY: u8 = 15;

/// IEEE-754 bit pattern reserved for a missing float
pub const FLOAT_MISSING_BITS: u32 = 0x7F80_0001;

/// Byte reserved for a missing character slot
pub const CHAR_MISSING: u8 = 0x00;

/// Element type of an encoded value, identified by its descriptor tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Type {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Float = 5,
    Char = 7,
}
impl Type {
    /// Resolves a descriptor tag, failing on tags this codec does not know.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(Self::Int8),
            2 => Ok(Self::Int16),
            3 => Ok(Self::Int32),
            5 => Ok(Self::Float),
            7 => Ok(Self::Char),
            _ => Err(FormatError::UnknownTypeTag(tag).into()),
        }
    }

    /// Payload bytes per element.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::Int8 | Self::Char => 1,
            Self::Int16 => 2,
            Self::Int32 | Self::Float => 4,
        }
    }

    /// The sentinel value reserved for a missing integer of this width.
    ///
    /// Only meaningful for the integer types.
    #[must_use]
    pub fn missing_int(&self) -> i32 {
        match self {
            Self::Int8 => i32::from(i8::MIN),
            Self::Int16 => i32::from(i16::MIN),
            _ => i32::MIN,
        }
    }

    /// True if `value` is legitimately encodable at this width. The most
    /// negative value of each width is excluded: it is the sentinel.
    #[must_use]
    pub fn encodes(&self, value: i32) -> bool {
        match self {
            Self::Int8 => (-127..=127).contains(&value),
            Self::Int16 => (-32_767..=32_767).contains(&value),
            Self::Int32 => value > i32::MIN,
            Self::Float | Self::Char => false,
        }
    }

    /// The minimal integer width that encodes `value`.
    #[must_use]
    pub fn for_int(value: i32) -> Self {
        if Self::Int8.encodes(value) {
            Self::Int8
        } else if Self::Int16.encodes(value) {
            Self::Int16
        } else {
            Self::Int32
        }
    }

    /// The minimal integer width that encodes every present value; widths are
    /// never mixed within one vector. An all-missing vector uses `Int8`.
    #[must_use]
    pub fn for_ints<I: IntoIterator<Item = i32>>(values: I) -> Self {
        values
            .into_iter()
            .map(Self::for_int)
            .max_by_key(Self::width)
            .unwrap_or(Self::Int8)
    }
}

/// A decoded value: a scalar, an ordered vector preserving missing slots, or
/// the missing marker itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i32),
    Float(f32),
    String(String),
    Ints(Vec<Option<i32>>),
    Floats(Vec<Option<f32>>),
    Strings(Vec<String>),
}

/// Packs arity and type into a descriptor byte; arity 15 marks the escape.
pub(crate) fn pack_descriptor(inline_arity: u8, ty: Type) -> u8 {
    debug_assert!(inline_arity <= OVERFLOW_ARITY);
    (inline_arity << 4) | ty as u8
}

/// Splits a descriptor byte into its raw arity field and type tag.
pub(crate) fn unpack_descriptor(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for ty in [Type::Int8, Type::Int16, Type::Int32, Type::Float, Type::Char] {
            assert_eq!(Type::from_tag(ty as u8).unwrap(), ty);
        }
        assert!(Type::from_tag(0).is_err());
        assert!(Type::from_tag(9).is_err());
    }

    #[test]
    fn test_sentinels_are_not_encodable() {
        assert!(!Type::Int8.encodes(-128));
        assert!(!Type::Int16.encodes(-32_768));
        assert!(!Type::Int32.encodes(i32::MIN));
    }

    #[test]
    fn test_width_selection() {
        assert_eq!(Type::for_ints([1, 10, 100]), Type::Int8);
        assert_eq!(Type::for_ints([1, 1000]), Type::Int16);
        assert_eq!(Type::for_ints([100_000]), Type::Int32);
        // boundary promotion: 128 exceeds the 8-bit sentinel-excluding range
        assert_eq!(Type::for_int(127), Type::Int8);
        assert_eq!(Type::for_int(128), Type::Int16);
        assert_eq!(Type::for_int(-127), Type::Int8);
        assert_eq!(Type::for_int(-128), Type::Int16);
    }

    #[test]
    fn test_descriptor_packing() {
        let byte = pack_descriptor(3, Type::Int16);
        assert_eq!(byte, 0x32);
        assert_eq!(unpack_descriptor(byte), (3, 2));
    }
}
