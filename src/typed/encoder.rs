//! Value encoding into the typed binary representation

use crate::error::{RangeError, Result};
use crate::typed::{
    pack_descriptor, Type, Value, FLOAT_MISSING_BITS, MAX_INLINE_ARITY, OVERFLOW_ARITY,
};

/// Accumulates encoded values into an owned byte buffer.
///
/// Integer widths are chosen by a full pre-scan of each vector; a value equal
/// to the sentinel of an explicitly requested width is rejected rather than
/// silently aliased to "missing".
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}
impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the encoded bytes, leaving the encoder empty for reuse.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Encodes any [`Value`]; a bare `Missing` is written as an arity-0
    /// integer descriptor.
    pub fn encode(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Missing => self.encode_missing(Type::Int8),
            Value::Int(v) => self.encode_typed_int(*v).map(|_| ()),
            Value::Float(v) => self.encode_typed_float(*v),
            Value::String(s) => self.encode_typed_string(s),
            Value::Ints(vs) => self.encode_typed_ints(vs, None).map(|_| ()),
            Value::Floats(vs) => self.encode_typed_floats(vs),
            Value::Strings(ss) => self.encode_string_list(ss),
        }
    }

    /// Encodes a scalar integer at its minimal width, returning the width
    /// chosen.
    pub fn encode_typed_int(&mut self, value: i32) -> Result<Type> {
        let ty = Type::for_int(value);
        self.encode_type(1, ty)?;
        self.push_int(value, ty);
        Ok(ty)
    }

    /// Encodes an integer vector, preserving missing slots positionally.
    ///
    /// With `explicit` the given width is used and every present value must
    /// be encodable at it; otherwise the minimal width covering all present
    /// values is selected.
    pub fn encode_typed_ints(
        &mut self,
        values: &[Option<i32>],
        explicit: Option<Type>,
    ) -> Result<Type> {
        let present = values.iter().filter_map(|v| *v);
        let ty = match explicit {
            Some(ty) => {
                for value in present {
                    if !ty.encodes(value) {
                        return Err(RangeError::UnencodableInteger(value).into());
                    }
                }
                ty
            }
            None => Type::for_ints(present),
        };

        self.encode_type(values.len(), ty)?;
        for value in values {
            self.push_int(value.unwrap_or_else(|| ty.missing_int()), ty);
        }
        Ok(ty)
    }

    pub fn encode_typed_float(&mut self, value: f32) -> Result<()> {
        self.encode_type(1, Type::Float)?;
        self.push_float(Some(value));
        Ok(())
    }

    /// Encodes a float vector, preserving missing slots positionally.
    pub fn encode_typed_floats(&mut self, values: &[Option<f32>]) -> Result<()> {
        self.encode_type(values.len(), Type::Float)?;
        for value in values {
            self.push_float(*value);
        }
        Ok(())
    }

    /// Encodes a string as raw bytes under a character descriptor.
    pub fn encode_typed_string(&mut self, value: &str) -> Result<()> {
        self.encode_type(value.len(), Type::Char)?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Encodes a list of strings as a single collapsed payload.
    ///
    /// A single string is written plain; multiple strings are joined with a
    /// comma separator and a leading comma marking the collapsed form. The
    /// separator must not appear inside any individual string; that is a
    /// caller-enforced precondition.
    pub fn encode_string_list(&mut self, values: &[String]) -> Result<()> {
        match values {
            [] => self.encode_missing(Type::Char),
            [single] => self.encode_typed_string(single),
            _ => {
                let mut collapsed = String::new();
                for value in values {
                    collapsed.push(',');
                    collapsed.push_str(value);
                }
                self.encode_typed_string(&collapsed)
            }
        }
    }

    /// Encodes an explicit missing value: a descriptor with arity 0 and no
    /// payload.
    pub fn encode_missing(&mut self, ty: Type) -> Result<()> {
        self.encode_type(0, ty)
    }

    /// Writes the descriptor byte, escaping the arity into a separately typed
    /// integer when it does not fit the packed field.
    fn encode_type(&mut self, arity: usize, ty: Type) -> Result<()> {
        if arity <= MAX_INLINE_ARITY {
            self.buf.push(pack_descriptor(arity as u8, ty));
        } else {
            self.buf.push(pack_descriptor(OVERFLOW_ARITY, ty));
            let count = i32::try_from(arity)
                .map_err(|_| RangeError::PositionOutOfRange {
                    position: arity as u64,
                    max: i32::MAX as u64,
                })?;
            self.encode_typed_int(count)?;
        }
        Ok(())
    }

    fn push_int(&mut self, value: i32, ty: Type) {
        match ty {
            Type::Int8 => self.buf.push(value as i8 as u8),
            Type::Int16 => self.buf.extend_from_slice(&(value as i16).to_le_bytes()),
            _ => self.buf.extend_from_slice(&value.to_le_bytes()),
        }
    }

    fn push_float(&mut self, value: Option<f32>) {
        let bits = value.map_or(FLOAT_MISSING_BITS, f32::to_bits);
        self.buf.extend_from_slice(&bits.to_le_bytes());
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_scalar_int_widths() {
        let mut enc = Encoder::new();
        assert_eq!(enc.encode_typed_int(100).unwrap(), Type::Int8);
        assert_eq!(enc.encode_typed_int(1000).unwrap(), Type::Int16);
        assert_eq!(enc.encode_typed_int(100_000).unwrap(), Type::Int32);
    }

    #[test]
    fn test_vector_width_is_minimal_over_all_values() {
        let mut enc = Encoder::new();
        let ty = enc
            .encode_typed_ints(&[Some(1), Some(1000)], None)
            .unwrap();
        assert_eq!(ty, Type::Int16);
        // descriptor + two 16-bit payload slots
        assert_eq!(enc.as_bytes().len(), 1 + 4);
        assert_eq!(enc.as_bytes()[0], 0x22);
    }

    #[test]
    fn test_missing_slots_store_sentinel() {
        let mut enc = Encoder::new();
        enc.encode_typed_ints(&[Some(1), None, Some(3)], None)
            .unwrap();
        assert_eq!(enc.as_bytes(), &[0x31, 1, 0x80, 3]);
    }

    #[test]
    fn test_explicit_width_rejects_sentinel_collision() {
        let mut enc = Encoder::new();
        let err = enc
            .encode_typed_ints(&[Some(-128)], Some(Type::Int8))
            .unwrap_err();
        assert!(matches!(err, crate::Error::RangeError(_)));
    }

    #[test]
    fn test_inline_and_escaped_arity() {
        let mut enc = Encoder::new();
        enc.encode_typed_ints(&vec![Some(1); 14], None).unwrap();
        assert_eq!(enc.take()[0], 0xE1);

        enc.encode_typed_ints(&vec![Some(1); 20], None).unwrap();
        let bytes = enc.take();
        // escape marker, then the count as a typed int scalar
        assert_eq!(bytes[0], 0xF1);
        assert_eq!(&bytes[1..3], &[0x11, 20]);
    }

    #[test]
    fn test_string_list_collapse() {
        let mut enc = Encoder::new();
        enc.encode_string_list(&["A".to_string(), "BB".to_string()])
            .unwrap();
        let bytes = enc.take();
        assert_eq!(&bytes[1..], b",A,BB");

        enc.encode_string_list(&["only".to_string()]).unwrap();
        assert_eq!(&enc.take()[1..], b"only");
    }

    #[test]
    fn test_missing_is_arity_zero() {
        let mut enc = Encoder::new();
        enc.encode_missing(Type::Int8).unwrap();
        assert_eq!(enc.as_bytes(), &[0x01]);
    }
}
