//! Status codes, timestamps, scalar variants and data values.
//!
//! [`DataValue`] is the canonical user of the encoding-mask idiom and is
//! encoded through an [`OptionalFieldSet`].

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

use super::binary::{write_byte_string, write_string, BinaryDecode, BinaryEncode, BinaryReader};
use super::optional_fields::{MaskWidth, OptionalFieldSet};
use crate::error::CodecError;

/// 32-bit status code. The top two bits carry the severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Operation succeeded.
    pub const GOOD: StatusCode = StatusCode(0);
    /// Decoding failed because the input was malformed.
    pub const BAD_DECODING_ERROR: StatusCode = StatusCode(0x8007_0000);
    /// Encoding exceeded a configured limit.
    pub const BAD_ENCODING_LIMITS_EXCEEDED: StatusCode = StatusCode(0x8008_0000);
    /// Extension object type is not known.
    pub const BAD_DATA_TYPE_ID_UNKNOWN: StatusCode = StatusCode(0x8011_0000);
    /// Continuation point is unknown or already released.
    pub const BAD_CONTINUATION_POINT_INVALID: StatusCode = StatusCode(0x804A_0000);
    /// Session has no continuation points left.
    pub const BAD_NO_CONTINUATION_POINTS: StatusCode = StatusCode(0x804B_0000);
    /// Message exceeds the negotiated size limits.
    pub const BAD_TCP_MESSAGE_TOO_LARGE: StatusCode = StatusCode(0x8080_0000);

    const SEVERITY_MASK: u32 = 0xC000_0000;

    /// Severity is good.
    pub fn is_good(self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0
    }

    /// Severity is uncertain.
    pub fn is_uncertain(self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0x4000_0000
    }

    /// Severity is bad.
    pub fn is_bad(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }
}

impl BinaryEncode for StatusCode {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u32_le(self.0);
        Ok(())
    }
}

impl BinaryDecode for StatusCode {
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        reader.read_u32().map(StatusCode)
    }
}

/// Timestamp as 100 ns ticks since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime(i64);

impl DateTime {
    /// Ticks between 1601-01-01 and the Unix epoch.
    const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

    /// Create from raw ticks.
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Raw tick count.
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }
}

impl From<SystemTime> for DateTime {
    fn from(time: SystemTime) -> Self {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::UNIX_EPOCH_TICKS + (d.as_nanos() / 100) as i64,
            Err(e) => Self::UNIX_EPOCH_TICKS - (e.duration().as_nanos() / 100) as i64,
        };
        Self(ticks.max(0))
    }
}

impl BinaryEncode for DateTime {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_i64_le(self.0);
        Ok(())
    }
}

impl BinaryDecode for DateTime {
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        reader.read_i64().map(DateTime)
    }
}

mod variant_type {
    pub const EMPTY: u8 = 0;
    pub const BOOLEAN: u8 = 1;
    pub const INT32: u8 = 6;
    pub const UINT32: u8 = 7;
    pub const INT64: u8 = 8;
    pub const DOUBLE: u8 = 11;
    pub const STRING: u8 = 12;
    pub const DATE_TIME: u8 = 13;
    pub const BYTE_STRING: u8 = 15;
    pub const STATUS_CODE: u8 = 19;
}

/// Scalar variant subset.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    /// No value.
    #[default]
    Empty,
    /// Boolean.
    Boolean(bool),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Double precision float.
    Double(f64),
    /// Nullable string.
    String(Option<String>),
    /// Timestamp.
    DateTime(DateTime),
    /// Nullable byte string.
    ByteString(Option<Bytes>),
    /// Status code.
    StatusCode(StatusCode),
}

impl BinaryEncode for Variant {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        use variant_type::*;
        match self {
            Variant::Empty => buf.put_u8(EMPTY),
            Variant::Boolean(v) => {
                buf.put_u8(BOOLEAN);
                v.encode(buf)?;
            }
            Variant::Int32(v) => {
                buf.put_u8(INT32);
                v.encode(buf)?;
            }
            Variant::UInt32(v) => {
                buf.put_u8(UINT32);
                v.encode(buf)?;
            }
            Variant::Int64(v) => {
                buf.put_u8(INT64);
                v.encode(buf)?;
            }
            Variant::Double(v) => {
                buf.put_u8(DOUBLE);
                v.encode(buf)?;
            }
            Variant::String(v) => {
                buf.put_u8(STRING);
                write_string(buf, v.as_deref())?;
            }
            Variant::DateTime(v) => {
                buf.put_u8(DATE_TIME);
                v.encode(buf)?;
            }
            Variant::ByteString(v) => {
                buf.put_u8(BYTE_STRING);
                write_byte_string(buf, v.as_deref())?;
            }
            Variant::StatusCode(v) => {
                buf.put_u8(STATUS_CODE);
                v.encode(buf)?;
            }
        }
        Ok(())
    }
}

impl BinaryDecode for Variant {
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        use variant_type::*;
        let value = match reader.read_u8()? {
            EMPTY => Variant::Empty,
            BOOLEAN => Variant::Boolean(bool::decode(reader)?),
            INT32 => Variant::Int32(reader.read_i32()?),
            UINT32 => Variant::UInt32(reader.read_u32()?),
            INT64 => Variant::Int64(reader.read_i64()?),
            DOUBLE => Variant::Double(reader.read_f64()?),
            STRING => Variant::String(reader.read_string()?),
            DATE_TIME => Variant::DateTime(DateTime::decode(reader)?),
            BYTE_STRING => Variant::ByteString(reader.read_byte_string()?),
            STATUS_CODE => Variant::StatusCode(StatusCode::decode(reader)?),
            // Arrays (bit 7) and the remaining built-in types are not handled here
            other => return Err(CodecError::UnsupportedVariantType(other)),
        };
        Ok(value)
    }
}

/// Value with quality and timestamps.
///
/// Every member is optional on the wire. `None` means the peer did not
/// send the field; use the accessors for the protocol defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    /// Value, bit 0.
    pub value: Option<Variant>,
    /// Status, bit 1. Defaults to `Good`.
    pub status: Option<StatusCode>,
    /// Source timestamp, bit 2. Defaults to null.
    pub source_timestamp: Option<DateTime>,
    /// Server timestamp, bit 3. Defaults to null.
    pub server_timestamp: Option<DateTime>,
    /// Source picoseconds, bit 4. Defaults to 0.
    pub source_picoseconds: Option<u16>,
    /// Server picoseconds, bit 5. Defaults to 0.
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    /// Data value carrying only `value`.
    pub fn new(value: Variant) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    /// Status, `Good` when absent.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::GOOD)
    }

    /// Source picoseconds, 0 when absent.
    pub fn source_picoseconds(&self) -> u16 {
        self.source_picoseconds.unwrap_or(0)
    }

    /// Server picoseconds, 0 when absent.
    pub fn server_picoseconds(&self) -> u16 {
        self.server_picoseconds.unwrap_or(0)
    }

    fn fields() -> &'static OptionalFieldSet<DataValue> {
        static FIELDS: OnceLock<OptionalFieldSet<DataValue>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            OptionalFieldSet::<DataValue>::new(MaskWidth::Byte)
                .field(
                    "value",
                    |dv| dv.value.is_some(),
                    |dv, buf| match &dv.value {
                        Some(v) => v.encode(buf),
                        None => Ok(()),
                    },
                    |dv, r| {
                        dv.value = Some(Variant::decode(r)?);
                        Ok(())
                    },
                )
                .field(
                    "status",
                    |dv| dv.status.is_some(),
                    |dv, buf| dv.status().encode(buf),
                    |dv, r| {
                        dv.status = Some(StatusCode::decode(r)?);
                        Ok(())
                    },
                )
                .field(
                    "source_timestamp",
                    |dv| dv.source_timestamp.is_some(),
                    |dv, buf| dv.source_timestamp.unwrap_or_default().encode(buf),
                    |dv, r| {
                        dv.source_timestamp = Some(DateTime::decode(r)?);
                        Ok(())
                    },
                )
                .field(
                    "server_timestamp",
                    |dv| dv.server_timestamp.is_some(),
                    |dv, buf| dv.server_timestamp.unwrap_or_default().encode(buf),
                    |dv, r| {
                        dv.server_timestamp = Some(DateTime::decode(r)?);
                        Ok(())
                    },
                )
                .field(
                    "source_picoseconds",
                    |dv| dv.source_picoseconds.is_some(),
                    |dv, buf| dv.source_picoseconds().encode(buf),
                    |dv, r| {
                        dv.source_picoseconds = Some(r.read_u16()?);
                        Ok(())
                    },
                )
                .field(
                    "server_picoseconds",
                    |dv| dv.server_picoseconds.is_some(),
                    |dv, buf| dv.server_picoseconds().encode(buf),
                    |dv, r| {
                        dv.server_picoseconds = Some(r.read_u16()?);
                        Ok(())
                    },
                )
        })
    }

    /// Encoding mask this value is written with.
    pub fn encoding_mask(&self) -> u8 {
        Self::fields().mask_for(self) as u8
    }
}

impl BinaryEncode for DataValue {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        Self::fields().encode(self, buf)
    }
}

impl BinaryDecode for DataValue {
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        Self::fields().decode(reader)
    }
}
