//! Codec module - binary encoding of message bodies.
//!
//! - [`BinaryEncode`] / [`BinaryDecode`] / [`BinaryReader`] - little-endian primitives
//! - [`NodeId`] - namespace-qualified identifiers
//! - [`OptionalFieldSet`] - encoding-mask driven optional fields
//! - [`DataValue`], [`Variant`], [`StatusCode`], [`DateTime`] - value types
//! - [`ExtensionObjectCodec`] - polymorphic envelope resolved through a
//!   [`TypeRegistry`](crate::registry::TypeRegistry)
//!
//! # Design
//!
//! Encoding appends to a `BytesMut` and decoding slices a `Bytes`, so
//! opaque bodies and byte strings are carried without copying.

mod binary;
mod data_value;
mod extension_object;
mod node_id;
mod optional_fields;

pub use binary::{write_byte_string, write_string, BinaryDecode, BinaryEncode, BinaryReader};
pub use data_value::{DataValue, DateTime, StatusCode, Variant};
pub use extension_object::{BodyEncoding, DecodeOptions, ExtensionObject, ExtensionObjectCodec, OpaqueStructure};
pub use node_id::{Identifier, NodeId};
pub use optional_fields::{
    DecodeFieldFn, EncodeFieldFn, MaskWidth, OptionalField, OptionalFieldSet, PresenceFn,
};
