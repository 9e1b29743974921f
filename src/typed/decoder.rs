//! Value decoding from the typed binary representation

use crate::error::{FormatError, Result, TruncationError};
use crate::typed::{
    unpack_descriptor, Type, Value, CHAR_MISSING, FLOAT_MISSING_BITS, OVERFLOW_ARITY,
};

/// A cursor over an encoded buffer, yielding one [`Value`] per call.
///
/// Reading past the end of the buffer fails with an end-of-data error; the
/// cursor is not rewound on failure.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}
impl<'a> Decoder<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte position in the buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Decodes the next value at the cursor.
    ///
    /// A scalar arity yields a scalar (or `Missing` for the sentinel); larger
    /// arities yield ordered vectors reproducing the encoded missing/present
    /// pattern exactly.
    pub fn decode(&mut self) -> Result<Value> {
        let (arity, ty) = self.decode_descriptor()?;

        if arity == 0 {
            return Ok(Value::Missing);
        }

        match ty {
            Type::Char => self.decode_chars(arity),
            Type::Float => {
                let mut values = Vec::with_capacity(arity);
                for _ in 0..arity {
                    values.push(self.decode_float_slot()?);
                }
                if arity == 1 {
                    Ok(values[0].map_or(Value::Missing, Value::Float))
                } else {
                    Ok(Value::Floats(values))
                }
            }
            _ => {
                let mut values = Vec::with_capacity(arity);
                for _ in 0..arity {
                    let raw = self.decode_int(ty)?;
                    values.push((raw != ty.missing_int()).then_some(raw));
                }
                if arity == 1 {
                    Ok(values[0].map_or(Value::Missing, Value::Int))
                } else {
                    Ok(Value::Ints(values))
                }
            }
        }
    }

    /// Reads a descriptor byte, resolving an escaped arity through the
    /// following typed integer.
    fn decode_descriptor(&mut self) -> Result<(usize, Type)> {
        let byte = self.read_bytes(1)?[0];
        let (arity_field, tag) = unpack_descriptor(byte);
        let ty = Type::from_tag(tag)?;

        if arity_field < OVERFLOW_ARITY {
            return Ok((usize::from(arity_field), ty));
        }

        // escaped count: a typed integer scalar follows the descriptor
        let (count_arity, count_ty) = {
            let byte = self.read_bytes(1)?[0];
            let (a, t) = unpack_descriptor(byte);
            (a, Type::from_tag(t)?)
        };
        if count_arity != 1 || !matches!(count_ty, Type::Int8 | Type::Int16 | Type::Int32) {
            return Err(FormatError::InvalidField {
                field: "vector arity",
                value: i64::from(count_arity),
            }
            .into());
        }
        let count = self.decode_int(count_ty)?;
        let count = usize::try_from(count).map_err(|_| FormatError::InvalidField {
            field: "vector arity",
            value: i64::from(count),
        })?;
        Ok((count, ty))
    }

    fn decode_chars(&mut self, arity: usize) -> Result<Value> {
        let bytes = self.read_bytes(arity)?;
        // fixed-width slots are padded with the missing byte
        let end = bytes
            .iter()
            .position(|&b| b == CHAR_MISSING)
            .unwrap_or(bytes.len());
        let text = std::str::from_utf8(&bytes[..end])?;

        if let Some(collapsed) = text.strip_prefix(',') {
            let values = collapsed.split(',').map(str::to_string).collect();
            return Ok(Value::Strings(values));
        }
        Ok(Value::String(text.to_string()))
    }

    fn decode_float_slot(&mut self) -> Result<Option<f32>> {
        let bytes = self.read_bytes(4)?;
        let bits = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if bits == FLOAT_MISSING_BITS {
            return Ok(None);
        }
        Ok(Some(f32::from_bits(bits)))
    }

    /// Reads one sign-extended integer of the given width.
    fn decode_int(&mut self, ty: Type) -> Result<i32> {
        let bytes = self.read_bytes(ty.width())?;
        Ok(match ty {
            Type::Int8 => i32::from(bytes[0] as i8),
            Type::Int16 => i32::from(i16::from_le_bytes([bytes[0], bytes[1]])),
            _ => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.buf.len() - self.pos;
        if available < n {
            return Err(TruncationError::EndOfData {
                position: self.pos,
                needed: n - available,
            }
            .into());
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::typed::Encoder;

    fn round_trip(value: &Value) -> Value {
        let mut enc = Encoder::new();
        enc.encode(value).unwrap();
        let bytes = enc.take();
        let mut dec = Decoder::new(&bytes);
        let decoded = dec.decode().unwrap();
        assert!(dec.is_at_end());
        decoded
    }

    #[test]
    fn test_scalar_round_trips() {
        assert_eq!(round_trip(&Value::Int(42)), Value::Int(42));
        assert_eq!(round_trip(&Value::Int(-30_000)), Value::Int(-30_000));
        assert_eq!(round_trip(&Value::Float(2.5)), Value::Float(2.5));
        assert_eq!(round_trip(&Value::Missing), Value::Missing);
    }

    #[test]
    fn test_missing_pattern_preserved_exactly() {
        let pattern = Value::Ints(vec![Some(7), None, Some(-1), None, None, Some(300)]);
        assert_eq!(round_trip(&pattern), pattern);

        let floats = Value::Floats(vec![None, Some(1.5), None]);
        assert_eq!(round_trip(&floats), floats);
    }

    #[test]
    fn test_sentinel_decodes_to_missing_scalar() {
        // an Int8 scalar holding the sentinel bit pattern
        let mut dec = Decoder::new(&[0x11, 0x80]);
        assert_eq!(dec.decode().unwrap(), Value::Missing);
    }

    #[test]
    fn test_string_and_list_round_trips() {
        assert_eq!(
            round_trip(&Value::String("PASS".to_string())),
            Value::String("PASS".to_string())
        );
        let list = Value::Strings(vec!["A".to_string(), "BB".to_string(), "C".to_string()]);
        assert_eq!(round_trip(&list), list);
    }

    #[test]
    fn test_escaped_arity_round_trip() {
        let values: Vec<Option<i32>> = (0..40).map(Some).collect();
        let decoded = round_trip(&Value::Ints(values.clone()));
        assert_eq!(decoded, Value::Ints(values));
    }

    #[test]
    fn test_decode_past_end_fails() {
        // descriptor promises two 32-bit values, only one present
        let mut dec = Decoder::new(&[0x23, 1, 0, 0, 0]);
        let err = dec.decode().unwrap_err();
        assert!(matches!(err, crate::Error::TruncationError(_)));
    }

    #[test]
    fn test_unknown_tag_fails() {
        let mut dec = Decoder::new(&[0x19]);
        let err = dec.decode().unwrap_err();
        assert!(matches!(err, crate::Error::FormatError(_)));
    }

    #[test]
    fn test_nul_padded_string() {
        let mut dec = Decoder::new(&[0x47, b'A', b'C', 0x00, 0x00]);
        assert_eq!(dec.decode().unwrap(), Value::String("AC".to_string()));
        assert!(dec.is_at_end());
    }
}
