//! Type descriptors and the structure traits they dispatch through.
//!
//! [`StructureType`] is implemented once per concrete structure and is what
//! gets registered. [`Structure`] is its object-safe face, used for decoded
//! values whose concrete type is only known at runtime. Every
//! `StructureType` is a `Structure` through a blanket impl.

use std::any::Any;
use std::fmt;

use bytes::BytesMut;
use serde::Serialize;

use crate::codec::{BinaryReader, NodeId};
use crate::error::CodecError;

/// A structured data type with a fixed binary schema.
pub trait StructureType: Default + Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Browse name of the data type.
    const NAME: &'static str;
    /// Data type node id.
    const TYPE_ID: NodeId;
    /// Binary encoding node id, written as the envelope type id.
    const BINARY_ENCODING_ID: NodeId;
    /// XML encoding node id.
    const XML_ENCODING_ID: NodeId = NodeId::NULL;

    /// Ordered field schema.
    fn fields() -> Vec<FieldDescriptor>;

    /// Write every field in schema order.
    fn encode_fields(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Read every field in schema order into `self`.
    fn decode_fields(&mut self, reader: &mut BinaryReader) -> Result<(), CodecError>;
}

/// Object-safe view of a [`StructureType`].
pub trait Structure: fmt::Debug + Send + Sync + 'static {
    /// Data type node id of the concrete type.
    fn data_type_id(&self) -> NodeId;

    /// Write every field in schema order.
    fn encode_fields(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Read every field in schema order into `self`.
    fn decode_fields(&mut self, reader: &mut BinaryReader) -> Result<(), CodecError>;

    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Convert into `Any` for downcasting by value.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Clone behind a box.
    fn clone_boxed(&self) -> Box<dyn Structure>;

    /// Equality across erased structures; different concrete types are never equal.
    fn eq_dyn(&self, other: &dyn Structure) -> bool;
}

impl<T: StructureType> Structure for T {
    fn data_type_id(&self) -> NodeId {
        T::TYPE_ID
    }

    fn encode_fields(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        StructureType::encode_fields(self, buf)
    }

    fn decode_fields(&mut self, reader: &mut BinaryReader) -> Result<(), CodecError> {
        StructureType::decode_fields(self, reader)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> Box<dyn Structure> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn Structure) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }
}

impl Clone for Box<dyn Structure> {
    fn clone(&self) -> Self {
        (**self).clone_boxed()
    }
}

impl PartialEq for Box<dyn Structure> {
    fn eq(&self, other: &Self) -> bool {
        (**self).eq_dyn(&**other)
    }
}

/// One field of a structure schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: &'static str,
    /// Name of the field's data type.
    pub data_type: &'static str,
    /// True for array fields.
    pub is_array: bool,
}

impl FieldDescriptor {
    /// Scalar field.
    pub const fn new(name: &'static str, data_type: &'static str) -> Self {
        Self {
            name,
            data_type,
            is_array: false,
        }
    }

    /// Array field.
    pub const fn array(name: &'static str, data_type: &'static str) -> Self {
        Self {
            name,
            data_type,
            is_array: true,
        }
    }
}

/// Constructs an empty instance of the described type.
pub type ConstructFn = fn() -> Box<dyn Structure>;

/// Decodes a complete instance of the described type.
pub type DecodeFn = fn(&mut BinaryReader) -> Result<Box<dyn Structure>, CodecError>;

/// Registration record for one structured type.
///
/// Built once at startup, immutable afterwards.
#[derive(Clone)]
pub struct TypeDescriptor {
    /// Browse name.
    pub name: &'static str,
    /// Data type node id.
    pub type_id: NodeId,
    /// Ordered field schema.
    pub fields: Vec<FieldDescriptor>,
    /// Binary encoding id. Null means the type cannot be binary encoded.
    pub binary_encoding_id: NodeId,
    /// XML encoding id. Null when there is none.
    pub xml_encoding_id: NodeId,
    construct: ConstructFn,
    decode: DecodeFn,
}

fn construct_default<T: StructureType>() -> Box<dyn Structure> {
    Box::new(T::default())
}

fn decode_boxed<T: StructureType>(reader: &mut BinaryReader) -> Result<Box<dyn Structure>, CodecError> {
    let mut value = T::default();
    StructureType::decode_fields(&mut value, reader)?;
    Ok(Box::new(value))
}

impl TypeDescriptor {
    /// Descriptor for a [`StructureType`].
    pub fn of<T: StructureType>() -> Self {
        Self {
            name: T::NAME,
            type_id: T::TYPE_ID,
            fields: T::fields(),
            binary_encoding_id: T::BINARY_ENCODING_ID,
            xml_encoding_id: T::XML_ENCODING_ID,
            construct: construct_default::<T>,
            decode: decode_boxed::<T>,
        }
    }

    /// Empty instance of the described type.
    pub fn construct(&self) -> Box<dyn Structure> {
        (self.construct)()
    }

    /// Decode an instance from `reader`.
    pub fn decode(&self, reader: &mut BinaryReader) -> Result<Box<dyn Structure>, CodecError> {
        (self.decode)(reader)
    }

    /// Encode `value`'s fields.
    pub fn encode(&self, value: &dyn Structure, buf: &mut BytesMut) -> Result<(), CodecError> {
        value.encode_fields(buf)
    }

    /// True when both descriptors describe the same wire schema.
    pub fn same_schema(&self, other: &TypeDescriptor) -> bool {
        self.type_id == other.type_id
            && self.fields == other.fields
            && self.binary_encoding_id == other.binary_encoding_id
            && self.xml_encoding_id == other.xml_encoding_id
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("type_id", &self.type_id)
            .field("fields", &self.fields)
            .field("binary_encoding_id", &self.binary_encoding_id)
            .field("xml_encoding_id", &self.xml_encoding_id)
            .finish()
    }
}
