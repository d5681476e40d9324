//! Extension object envelope codec.
//!
//! An extension object carries any registered structure, or a payload this
//! process cannot interpret, inside a message:
//!
//! ```text
//! ┌──────────┬──────────┬─────────────────┬───────────────┐
//! │ TypeId   │ Encoding │ Length          │ Body          │
//! │ NodeId   │ u8       │ u32 LE          │ Length bytes  │
//! │          │ 0/1/2    │ absent if 0     │               │
//! └──────────┴──────────┴─────────────────┴───────────────┘
//! ```
//!
//! The type id on the wire is the *encoding* id of the structure, not its
//! data type id.
//!
//! Decoding distinguishes four outcomes, see [`ExtensionObject`]. The body
//! is always read through a sub-reader bounded by the declared length, so
//! the outer cursor lands on the declared boundary whatever the inner
//! decoder does.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bytes::BytesMut;
//! use ua_wire::codec::{BinaryReader, ExtensionObject, ExtensionObjectCodec};
//! use ua_wire::registry::{Range, TypeRegistry};
//!
//! let codec = ExtensionObjectCodec::new(Arc::new(TypeRegistry::with_standard_types()));
//!
//! let mut buf = BytesMut::new();
//! codec.encode(&ExtensionObject::new(Range { low: 0.0, high: 10.0 }), &mut buf).unwrap();
//!
//! let decoded = codec.decode(&mut BinaryReader::new(buf.freeze())).unwrap();
//! assert_eq!(decoded.downcast_ref::<Range>().unwrap().high, 10.0);
//! ```

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{error, warn};

use super::binary::{BinaryDecode, BinaryEncode, BinaryReader};
use super::node_id::NodeId;
use crate::error::CodecError;
use crate::registry::{Structure, StructureType, TypeRegistry};

/// Body encoding byte of an extension object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BodyEncoding {
    /// No body follows.
    None = 0,
    /// Binary encoded body.
    Binary = 1,
    /// XML encoded body.
    Xml = 2,
}

impl TryFrom<u8> for BodyEncoding {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BodyEncoding::None),
            1 => Ok(BodyEncoding::Binary),
            2 => Ok(BodyEncoding::Xml),
            other => Err(CodecError::InvalidEncodingKind(other)),
        }
    }
}

/// A payload preserved verbatim because it could not be interpreted.
///
/// Re-encoding writes the same type id, encoding and body bytes, so a
/// process can forward structures it never loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueStructure {
    /// Encoding id as read from the wire.
    pub type_id: NodeId,
    /// Body encoding. Never [`BodyEncoding::None`] for decoded values.
    pub encoding: BodyEncoding,
    /// Raw body bytes.
    pub body: Bytes,
}

impl OpaqueStructure {
    /// Binary opaque payload.
    pub fn binary(type_id: NodeId, body: impl Into<Bytes>) -> Self {
        Self {
            type_id,
            encoding: BodyEncoding::Binary,
            body: body.into(),
        }
    }
}

/// Decoded extension object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExtensionObject {
    /// No object.
    #[default]
    Null,
    /// Decoded as a known registered type.
    Structure(Box<dyn Structure>),
    /// Preserved as an uninterpreted payload.
    Opaque(OpaqueStructure),
    /// Type id in the local namespace with no registered descriptor.
    /// The body is kept uninterpreted and re-encoded verbatim.
    Unknown(OpaqueStructure),
}

impl ExtensionObject {
    /// Wrap a structure.
    pub fn new<T: StructureType>(value: T) -> Self {
        ExtensionObject::Structure(Box::new(value))
    }

    /// True for [`ExtensionObject::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, ExtensionObject::Null)
    }

    /// Borrow the structure if it is a `T`.
    pub fn downcast_ref<T: StructureType>(&self) -> Option<&T> {
        match self {
            ExtensionObject::Structure(value) => value.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Take the structure if it is a `T`.
    pub fn into_structure<T: StructureType>(self) -> Option<T> {
        match self {
            ExtensionObject::Structure(value) => value.into_any().downcast::<T>().ok().map(|b| *b),
            _ => None,
        }
    }
}

impl From<OpaqueStructure> for ExtensionObject {
    fn from(value: OpaqueStructure) -> Self {
        ExtensionObject::Opaque(value)
    }
}

/// Decode behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Treat a body length mismatch, or a failure inside a known type's
    /// decoder, as an error instead of warning and resynchronizing.
    pub strict_body_length: bool,
}

impl DecodeOptions {
    /// Options with strict body length checking.
    pub fn strict() -> Self {
        Self {
            strict_body_length: true,
        }
    }
}

/// Encodes and decodes extension objects against a [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct ExtensionObjectCodec {
    registry: Arc<TypeRegistry>,
    options: DecodeOptions,
}

impl ExtensionObjectCodec {
    /// Create a lenient codec.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_options(registry, DecodeOptions::default())
    }

    /// Create a codec with explicit options.
    pub fn with_options(registry: Arc<TypeRegistry>, options: DecodeOptions) -> Self {
        Self { registry, options }
    }

    /// The registry types are resolved against.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Active decode options.
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Encode one extension object.
    ///
    /// [`ExtensionObject::Opaque`] and [`ExtensionObject::Unknown`] are
    /// written back with their original type id and body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidEncodingConfiguration`] if a structure's
    /// type is not registered or has no binary encoding id.
    pub fn encode(&self, object: &ExtensionObject, buf: &mut BytesMut) -> Result<(), CodecError> {
        match object {
            ExtensionObject::Null => {
                NodeId::NULL.encode(buf)?;
                buf.put_u8(BodyEncoding::None as u8);
            }
            ExtensionObject::Opaque(opaque) | ExtensionObject::Unknown(opaque) => {
                let encoding = match opaque.encoding {
                    BodyEncoding::Xml => BodyEncoding::Xml,
                    _ => BodyEncoding::Binary,
                };
                opaque.type_id.encode(buf)?;
                buf.put_u8(encoding as u8);
                put_body_length(buf, opaque.body.len())?;
                buf.put_slice(&opaque.body);
            }
            ExtensionObject::Structure(value) => self.encode_structure(&**value, buf)?,
        }
        Ok(())
    }

    fn encode_structure(&self, value: &dyn Structure, buf: &mut BytesMut) -> Result<(), CodecError> {
        let type_id = value.data_type_id();

        let desc = match self.registry.lookup(&type_id) {
            Some(desc) if !desc.binary_encoding_id.is_null() => desc,
            found => {
                let reason = if found.is_some() {
                    "no binary encoding id"
                } else {
                    "type is not registered"
                };
                error!(type_id = %type_id, reason, "cannot encode extension object");
                return Err(CodecError::InvalidEncodingConfiguration {
                    type_id,
                    reason: reason.to_string(),
                });
            }
        };

        desc.binary_encoding_id.encode(buf)?;
        buf.put_u8(BodyEncoding::Binary as u8);

        let length_at = buf.len();
        buf.put_u32_le(0);
        let body_start = buf.len();
        desc.encode(value, buf)?;

        let body_len = buf.len() - body_start;
        let body_len = u32::try_from(body_len).map_err(|_| CodecError::TooLarge(body_len))?;
        buf[length_at..body_start].copy_from_slice(&body_len.to_le_bytes());
        Ok(())
    }

    /// Decode one extension object.
    ///
    /// # Errors
    ///
    /// Truncated input, an invalid encoding byte or a malformed type id are
    /// always errors. In strict mode a body length mismatch or a failure
    /// inside a known type's decoder is an error too; otherwise these are
    /// logged and recovered.
    pub fn decode(&self, reader: &mut BinaryReader) -> Result<ExtensionObject, CodecError> {
        let type_id = NodeId::decode(reader)?;
        let encoding = BodyEncoding::try_from(reader.read_u8()?)?;
        if encoding == BodyEncoding::None {
            return Ok(ExtensionObject::Null);
        }

        let declared = reader.read_u32()? as usize;
        let mut body = reader.split_to(declared)?;

        if encoding == BodyEncoding::Xml || !self.registry.is_known_namespace(type_id.namespace) {
            return Ok(ExtensionObject::Opaque(OpaqueStructure {
                type_id,
                encoding,
                body: body.remaining_bytes(),
            }));
        }

        let Some(desc) = self.registry.lookup_by_encoding_id(&type_id) else {
            warn!(type_id = %type_id, length = declared, "extension object of unknown type kept uninterpreted");
            return Ok(ExtensionObject::Unknown(OpaqueStructure {
                type_id,
                encoding,
                body: body.remaining_bytes(),
            }));
        };

        let raw = body.remaining_bytes();
        match desc.decode(&mut body) {
            Ok(value) => {
                if !body.is_empty() {
                    let consumed = declared - body.remaining();
                    if self.options.strict_body_length {
                        return Err(CodecError::SchemaMismatch {
                            type_id,
                            declared,
                            consumed,
                        });
                    }
                    warn!(
                        type_id = %type_id,
                        declared,
                        consumed,
                        "extension object body length mismatch, resynchronized to declared length"
                    );
                }
                Ok(ExtensionObject::Structure(value))
            }
            Err(e) if self.options.strict_body_length => Err(e),
            Err(e) => {
                warn!(
                    type_id = %type_id,
                    declared,
                    error = %e,
                    "extension object body failed to decode, preserved as opaque"
                );
                Ok(ExtensionObject::Opaque(OpaqueStructure {
                    type_id,
                    encoding,
                    body: raw,
                }))
            }
        }
    }

    /// Encode an array of extension objects with an `i32` count prefix.
    pub fn encode_array(&self, objects: &[ExtensionObject], buf: &mut BytesMut) -> Result<(), CodecError> {
        let count = i32::try_from(objects.len()).map_err(|_| CodecError::TooLarge(objects.len()))?;
        buf.put_i32_le(count);
        for object in objects {
            self.encode(object, buf)?;
        }
        Ok(())
    }

    /// Decode an `i32`-counted array. A null array (-1) decodes as empty.
    pub fn decode_array(&self, reader: &mut BinaryReader) -> Result<Vec<ExtensionObject>, CodecError> {
        let count = match reader.read_i32()? {
            -1 => return Ok(Vec::new()),
            n if n < -1 => return Err(CodecError::InvalidLength(n)),
            n => n as usize,
        };

        // Each element takes at least two bytes.
        let mut objects = Vec::with_capacity(count.min(reader.remaining() / 2));
        for _ in 0..count {
            objects.push(self.decode(reader)?);
        }
        Ok(objects)
    }
}

fn put_body_length(buf: &mut BytesMut, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::TooLarge(len))?;
    buf.put_u32_le(len);
    Ok(())
}
