//! Little-endian binary primitives.
//!
//! Encoding writes into a `bytes::BytesMut`; decoding reads from a
//! [`BinaryReader`], a bounds-checked cursor over `bytes::Bytes`. Every read
//! checks the remaining length first, so malformed input surfaces as
//! [`CodecError::UnexpectedEof`] instead of a panic.
//!
//! Strings and byte strings carry an `i32` length prefix where `-1` encodes
//! a null value.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use ua_wire::codec::{BinaryDecode, BinaryEncode, BinaryReader};
//!
//! let mut buf = BytesMut::new();
//! 42u32.encode(&mut buf).unwrap();
//! Some("hello".to_string()).encode(&mut buf).unwrap();
//!
//! let mut reader = BinaryReader::new(buf.freeze());
//! assert_eq!(u32::decode(&mut reader).unwrap(), 42);
//! assert_eq!(Option::<String>::decode(&mut reader).unwrap().as_deref(), Some("hello"));
//! assert!(reader.is_empty());
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;

/// Types that can write themselves in binary form.
pub trait BinaryEncode {
    /// Append the encoded value to `buf`.
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;
}

/// Types that can be read back from binary form.
pub trait BinaryDecode: Sized {
    /// Read one value, advancing the reader past it.
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError>;
}

/// Bounds-checked cursor over a byte buffer.
///
/// Slices handed out by [`read_bytes`](Self::read_bytes) and
/// [`split_to`](Self::split_to) share the underlying allocation.
#[derive(Debug, Clone)]
pub struct BinaryReader {
    data: Bytes,
    start_len: usize,
}

impl BinaryReader {
    /// Create a reader over `data`.
    pub fn new(data: Bytes) -> Self {
        let start_len = data.len();
        Self { data, start_len }
    }

    /// Create a reader over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.start_len - self.data.remaining()
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    /// True when every byte has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        if self.data.remaining() < needed {
            return Err(CodecError::UnexpectedEof {
                needed,
                remaining: self.data.remaining(),
            });
        }
        Ok(())
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.ensure(1)?;
        Ok(self.data.get_u8())
    }

    /// Read a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        self.ensure(2)?;
        Ok(self.data.get_u16_le())
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.ensure(4)?;
        Ok(self.data.get_u32_le())
    }

    /// Read a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.ensure(4)?;
        Ok(self.data.get_i32_le())
    }

    /// Read a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        self.ensure(8)?;
        Ok(self.data.get_u64_le())
    }

    /// Read a little-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        self.ensure(8)?;
        Ok(self.data.get_i64_le())
    }

    /// Read a little-endian IEEE 754 double.
    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        self.ensure(8)?;
        Ok(self.data.get_f64_le())
    }

    /// Read `len` bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, CodecError> {
        self.ensure(len)?;
        Ok(self.data.split_to(len))
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        self.data.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Skip `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        self.ensure(len)?;
        self.data.advance(len);
        Ok(())
    }

    /// Split off the next `len` bytes as an independent reader.
    ///
    /// `self` moves past those bytes whatever the sub-reader later consumes,
    /// which is what keeps sibling fields aligned around a length-prefixed
    /// body.
    pub fn split_to(&mut self, len: usize) -> Result<BinaryReader, CodecError> {
        Ok(BinaryReader::new(self.read_bytes(len)?))
    }

    /// Unread bytes, without copying.
    pub fn remaining_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Read an `i32` length prefix. `None` means null (-1).
    fn read_length(&mut self) -> Result<Option<usize>, CodecError> {
        match self.read_i32()? {
            -1 => Ok(None),
            len if len < -1 => Err(CodecError::InvalidLength(len)),
            len => Ok(Some(len as usize)),
        }
    }

    /// Read a nullable UTF-8 string.
    pub fn read_string(&mut self) -> Result<Option<String>, CodecError> {
        match self.read_length()? {
            None => Ok(None),
            Some(len) => {
                let raw = self.read_bytes(len)?;
                String::from_utf8(raw.to_vec())
                    .map(Some)
                    .map_err(|_| CodecError::InvalidUtf8)
            }
        }
    }

    /// Read a nullable byte string without copying.
    pub fn read_byte_string(&mut self) -> Result<Option<Bytes>, CodecError> {
        match self.read_length()? {
            None => Ok(None),
            Some(len) => self.read_bytes(len).map(Some),
        }
    }
}

/// Write an `i32` length prefix, `-1` for null.
fn write_length(buf: &mut BytesMut, len: Option<usize>) -> Result<(), CodecError> {
    match len {
        None => buf.put_i32_le(-1),
        Some(len) => {
            let len = i32::try_from(len).map_err(|_| CodecError::TooLarge(len))?;
            buf.put_i32_le(len);
        }
    }
    Ok(())
}

/// Write a nullable UTF-8 string.
pub fn write_string(buf: &mut BytesMut, value: Option<&str>) -> Result<(), CodecError> {
    write_length(buf, value.map(str::len))?;
    if let Some(s) = value {
        buf.put_slice(s.as_bytes());
    }
    Ok(())
}

/// Write a nullable byte string.
pub fn write_byte_string(buf: &mut BytesMut, value: Option<&[u8]>) -> Result<(), CodecError> {
    write_length(buf, value.map(<[u8]>::len))?;
    if let Some(b) = value {
        buf.put_slice(b);
    }
    Ok(())
}

macro_rules! impl_scalar {
    ($ty:ty, $put:ident, $read:ident) => {
        impl BinaryEncode for $ty {
            #[inline]
            fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
                buf.$put(*self);
                Ok(())
            }
        }

        impl BinaryDecode for $ty {
            #[inline]
            fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
                reader.$read()
            }
        }
    };
}

impl_scalar!(u8, put_u8, read_u8);
impl_scalar!(u16, put_u16_le, read_u16);
impl_scalar!(u32, put_u32_le, read_u32);
impl_scalar!(i32, put_i32_le, read_i32);
impl_scalar!(u64, put_u64_le, read_u64);
impl_scalar!(i64, put_i64_le, read_i64);
impl_scalar!(f64, put_f64_le, read_f64);

impl BinaryEncode for bool {
    #[inline]
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(u8::from(*self));
        Ok(())
    }
}

impl BinaryDecode for bool {
    #[inline]
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        Ok(reader.read_u8()? != 0)
    }
}

impl BinaryEncode for Option<String> {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        write_string(buf, self.as_deref())
    }
}

impl BinaryDecode for Option<String> {
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        reader.read_string()
    }
}

impl BinaryEncode for Option<Bytes> {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        write_byte_string(buf, self.as_deref())
    }
}

impl BinaryDecode for Option<Bytes> {
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        reader.read_byte_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_little_endian() {
        let mut buf = BytesMut::new();
        0x0102_0304u32.encode(&mut buf).unwrap();
        (-2i32).encode(&mut buf).unwrap();
        true.encode(&mut buf).unwrap();

        assert_eq!(&buf[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[4..8], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(buf[8], 1);

        let mut reader = BinaryReader::new(buf.freeze());
        assert_eq!(reader.read_u32().unwrap(), 0x0102_0304);
        assert_eq!(reader.read_i32().unwrap(), -2);
        assert!(bool::decode(&mut reader).unwrap());
        assert!(reader.is_empty());
    }

    #[test]
    fn test_null_and_empty_strings_differ() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, None).unwrap();
        write_string(&mut buf, Some("")).unwrap();

        assert_eq!(&buf[..4], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 0]);

        let mut reader = BinaryReader::new(buf.freeze());
        assert_eq!(reader.read_string().unwrap(), None);
        assert_eq!(reader.read_string().unwrap(), Some(String::new()));
    }

    #[test]
    fn test_short_input_is_eof_error() {
        let mut reader = BinaryReader::from_slice(&[1, 2, 3]);
        let err = reader.read_u32().unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedEof {
                needed: 4,
                remaining: 3
            }
        );
        // Failed read leaves the cursor untouched
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_negative_length_rejected() {
        let mut reader = BinaryReader::from_slice(&(-5i32).to_le_bytes());
        assert_eq!(
            reader.read_byte_string().unwrap_err(),
            CodecError::InvalidLength(-5)
        );
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut buf = BytesMut::new();
        write_byte_string(&mut buf, Some(&[0xC3, 0x28])).unwrap();
        let mut reader = BinaryReader::new(buf.freeze());
        assert_eq!(reader.read_string().unwrap_err(), CodecError::InvalidUtf8);
    }

    #[test]
    fn test_split_to_advances_parent() {
        let mut reader = BinaryReader::from_slice(&[1, 2, 3, 4, 5, 6]);
        let mut sub = reader.split_to(4).unwrap();

        assert_eq!(reader.position(), 4);
        assert_eq!(sub.read_u8().unwrap(), 1);
        assert_eq!(sub.remaining(), 3);
        assert_eq!(reader.read_u8().unwrap(), 5);
    }

    #[test]
    fn test_read_bytes_zero_copy() {
        let data = Bytes::from_static(b"abcdef");
        let mut reader = BinaryReader::new(data.clone());
        reader.skip(2).unwrap();
        let slice = reader.read_bytes(3).unwrap();

        assert_eq!(&slice[..], b"cde");
        assert_eq!(slice.as_ptr(), data[2..].as_ptr());
    }
}
