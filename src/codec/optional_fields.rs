//! Encoding-mask driven optional fields.
//!
//! Many structures prefix their body with a bitmask saying which optional
//! fields follow. [`OptionalFieldSet`] captures that idiom once:
//!
//! ```text
//! ┌──────┬───────────────┬───────────────┬─────┐
//! │ Mask │ field 0       │ field 1       │ ... │
//! │ u8   │ if bit 0 set  │ if bit 1 set  │     │
//! └──────┴───────────────┴───────────────┴─────┘
//! ```
//!
//! Bit `i` is set iff field `i`'s presence predicate holds at encode time.
//! On decode only flagged fields are read; every other field keeps the
//! value from `T::default()`, so an absent field can never be mistaken for
//! an explicit zero written by the peer.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use ua_wire::codec::{BinaryDecode, BinaryEncode, BinaryReader, MaskWidth, OptionalFieldSet};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Sample {
//!     quality: Option<u32>,
//!     note: Option<String>,
//! }
//!
//! let fields = OptionalFieldSet::<Sample>::new(MaskWidth::Byte)
//!     .field(
//!         "quality",
//!         |s| s.quality.is_some(),
//!         |s, buf| s.quality.unwrap_or_default().encode(buf),
//!         |s, r| Ok(s.quality = Some(u32::decode(r)?)),
//!     )
//!     .field(
//!         "note",
//!         |s| s.note.is_some(),
//!         |s, buf| s.note.encode(buf),
//!         |s, r| Ok(s.note = Option::<String>::decode(r)?),
//!     );
//!
//! let value = Sample { quality: None, note: Some("ok".into()) };
//! let mut buf = BytesMut::new();
//! fields.encode(&value, &mut buf).unwrap();
//! assert_eq!(buf[0], 0b10);
//!
//! let decoded = fields.decode(&mut BinaryReader::new(buf.freeze())).unwrap();
//! assert_eq!(decoded, value);
//! ```

use bytes::{BufMut, BytesMut};

use super::binary::BinaryReader;
use crate::error::CodecError;

/// Predicate deciding whether a field is written.
pub type PresenceFn<T> = fn(&T) -> bool;

/// Writes one field of `T`.
pub type EncodeFieldFn<T> = fn(&T, &mut BytesMut) -> Result<(), CodecError>;

/// Reads one field into `T`.
pub type DecodeFieldFn<T> = fn(&mut T, &mut BinaryReader) -> Result<(), CodecError>;

/// Width of the presence mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskWidth {
    /// One byte, up to 8 fields.
    Byte,
    /// Little-endian `u32`, up to 32 fields.
    Word,
}

impl MaskWidth {
    /// Maximum number of fields this width can describe.
    pub const fn capacity(self) -> usize {
        match self {
            MaskWidth::Byte => 8,
            MaskWidth::Word => 32,
        }
    }
}

/// One optional field: its name, presence predicate and codec functions.
pub struct OptionalField<T> {
    name: &'static str,
    is_present: PresenceFn<T>,
    encode: EncodeFieldFn<T>,
    decode: DecodeFieldFn<T>,
}

impl<T> OptionalField<T> {
    /// Field name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Ordered set of optional fields sharing one presence mask.
pub struct OptionalFieldSet<T> {
    width: MaskWidth,
    fields: Vec<OptionalField<T>>,
}

impl<T> OptionalFieldSet<T> {
    /// Create an empty set with the given mask width.
    pub fn new(width: MaskWidth) -> Self {
        Self {
            width,
            fields: Vec::with_capacity(width.capacity()),
        }
    }

    /// Append a field. Its bit is the next unused one.
    ///
    /// # Panics
    ///
    /// Panics if the mask width has no bit left for another field.
    pub fn field(
        mut self,
        name: &'static str,
        is_present: PresenceFn<T>,
        encode: EncodeFieldFn<T>,
        decode: DecodeFieldFn<T>,
    ) -> Self {
        assert!(
            self.fields.len() < self.width.capacity(),
            "optional field `{}` does not fit a {:?} mask",
            name,
            self.width
        );
        self.fields.push(OptionalField {
            name,
            is_present,
            encode,
            decode,
        });
        self
    }

    /// Declared fields in bit order.
    pub fn fields(&self) -> &[OptionalField<T>] {
        &self.fields
    }

    /// Bits that correspond to declared fields.
    pub fn allowed_mask(&self) -> u32 {
        match self.fields.len() {
            32 => u32::MAX,
            n => (1u32 << n) - 1,
        }
    }

    /// Mask that `value` would be encoded with.
    pub fn mask_for(&self, value: &T) -> u32 {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| (field.is_present)(value))
            .fold(0, |mask, (bit, _)| mask | (1 << bit))
    }

    /// Write the mask followed by every present field.
    pub fn encode(&self, value: &T, buf: &mut BytesMut) -> Result<(), CodecError> {
        let mask = self.mask_for(value);
        match self.width {
            MaskWidth::Byte => buf.put_u8(mask as u8),
            MaskWidth::Word => buf.put_u32_le(mask),
        }
        for (bit, field) in self.fields.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                (field.encode)(value, buf)?;
            }
        }
        Ok(())
    }

    /// Read the mask and every flagged field into `value`.
    ///
    /// Fields whose bit is clear are left untouched. Returns the mask read.
    pub fn decode_into(&self, value: &mut T, reader: &mut BinaryReader) -> Result<u32, CodecError> {
        let mask = match self.width {
            MaskWidth::Byte => u32::from(reader.read_u8()?),
            MaskWidth::Word => reader.read_u32()?,
        };

        let allowed = self.allowed_mask();
        if mask & !allowed != 0 {
            return Err(CodecError::InvalidEncodingMask { mask, allowed });
        }

        for (bit, field) in self.fields.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                (field.decode)(value, reader)?;
            }
        }
        Ok(mask)
    }

    /// Decode a fresh value; absent fields take `T::default()`.
    pub fn decode(&self, reader: &mut BinaryReader) -> Result<T, CodecError>
    where
        T: Default,
    {
        let mut value = T::default();
        self.decode_into(&mut value, reader)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BinaryDecode, BinaryEncode};

    #[derive(Debug, Default, PartialEq)]
    struct Reading {
        raw: Option<i32>,
        scale: Option<f64>,
        unit: Option<u32>,
    }

    fn reading_fields() -> OptionalFieldSet<Reading> {
        OptionalFieldSet::<Reading>::new(MaskWidth::Byte)
            .field(
                "raw",
                |r| r.raw.is_some(),
                |r, buf| r.raw.unwrap_or_default().encode(buf),
                |r, rd| {
                    r.raw = Some(i32::decode(rd)?);
                    Ok(())
                },
            )
            .field(
                "scale",
                |r| r.scale.is_some(),
                |r, buf| r.scale.unwrap_or_default().encode(buf),
                |r, rd| {
                    r.scale = Some(f64::decode(rd)?);
                    Ok(())
                },
            )
            .field(
                "unit",
                |r| r.unit.is_some(),
                |r, buf| r.unit.unwrap_or_default().encode(buf),
                |r, rd| {
                    r.unit = Some(u32::decode(rd)?);
                    Ok(())
                },
            )
    }

    #[test]
    fn test_mask_bits_follow_presence() {
        let fields = reading_fields();
        let value = Reading {
            raw: Some(0),
            scale: None,
            unit: Some(7),
        };
        assert_eq!(fields.mask_for(&value), 0b101);
        assert_eq!(fields.mask_for(&Reading::default()), 0);
    }

    #[test]
    fn test_only_present_fields_written() {
        let fields = reading_fields();
        let value = Reading {
            raw: None,
            scale: None,
            unit: Some(0x0A0B),
        };

        let mut buf = BytesMut::new();
        fields.encode(&value, &mut buf).unwrap();

        assert_eq!(&buf[..], &[0b100, 0x0B, 0x0A, 0x00, 0x00]);
    }

    #[test]
    fn test_explicit_zero_survives_decode() {
        let fields = reading_fields();
        let value = Reading {
            raw: Some(0),
            scale: None,
            unit: None,
        };

        let mut buf = BytesMut::new();
        fields.encode(&value, &mut buf).unwrap();
        let decoded = fields.decode(&mut BinaryReader::new(buf.freeze())).unwrap();

        assert_eq!(decoded.raw, Some(0));
        assert_eq!(decoded.scale, None);
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_undeclared_bits_rejected() {
        let fields = reading_fields();
        let mut reader = BinaryReader::from_slice(&[0b1000]);
        assert_eq!(
            fields.decode(&mut reader).unwrap_err(),
            CodecError::InvalidEncodingMask {
                mask: 0b1000,
                allowed: 0b111
            }
        );
    }

    #[test]
    fn test_word_mask() {
        let mut fields = OptionalFieldSet::<Reading>::new(MaskWidth::Word);
        for _ in 0..9 {
            fields = fields.field("pad", |_| false, |_, _| Ok(()), |_, _| Ok(()));
        }
        let fields = fields.field(
            "unit",
            |r| r.unit.is_some(),
            |r, buf| r.unit.unwrap_or_default().encode(buf),
            |r, rd| {
                r.unit = Some(u32::decode(rd)?);
                Ok(())
            },
        );

        let value = Reading {
            unit: Some(3),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        fields.encode(&value, &mut buf).unwrap();
        assert_eq!(&buf[..4], &(1u32 << 9).to_le_bytes());

        let decoded = fields.decode(&mut BinaryReader::new(buf.freeze())).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_byte_mask_capacity() {
        let mut fields = OptionalFieldSet::<Reading>::new(MaskWidth::Byte);
        for _ in 0..9 {
            fields = fields.field("pad", |_| false, |_, _| Ok(()), |_, _| Ok(()));
        }
    }

    #[test]
    fn test_truncated_field_is_error() {
        let fields = reading_fields();
        let mut reader = BinaryReader::from_slice(&[0b001, 0x01]);
        assert!(matches!(
            fields.decode(&mut reader),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }
}
