//! Built-in namespace-0 structures.

use bytes::BytesMut;

use super::descriptor::{FieldDescriptor, StructureType};
use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, DateTime, NodeId};
use crate::error::CodecError;

/// Inclusive numeric range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Range {
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl StructureType for Range {
    const NAME: &'static str = "Range";
    const TYPE_ID: NodeId = NodeId::numeric(0, 884);
    const BINARY_ENCODING_ID: NodeId = NodeId::numeric(0, 886);
    const XML_ENCODING_ID: NodeId = NodeId::numeric(0, 885);

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("Low", "Double"),
            FieldDescriptor::new("High", "Double"),
        ]
    }

    fn encode_fields(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.low.encode(buf)?;
        self.high.encode(buf)
    }

    fn decode_fields(&mut self, reader: &mut BinaryReader) -> Result<(), CodecError> {
        self.low = f64::decode(reader)?;
        self.high = f64::decode(reader)?;
        Ok(())
    }
}

/// Server build information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildInfo {
    pub product_uri: Option<String>,
    pub manufacturer_name: Option<String>,
    pub product_name: Option<String>,
    pub software_version: Option<String>,
    pub build_number: Option<String>,
    pub build_date: DateTime,
}

impl StructureType for BuildInfo {
    const NAME: &'static str = "BuildInfo";
    const TYPE_ID: NodeId = NodeId::numeric(0, 338);
    const BINARY_ENCODING_ID: NodeId = NodeId::numeric(0, 340);
    const XML_ENCODING_ID: NodeId = NodeId::numeric(0, 339);

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("ProductUri", "String"),
            FieldDescriptor::new("ManufacturerName", "String"),
            FieldDescriptor::new("ProductName", "String"),
            FieldDescriptor::new("SoftwareVersion", "String"),
            FieldDescriptor::new("BuildNumber", "String"),
            FieldDescriptor::new("BuildDate", "DateTime"),
        ]
    }

    fn encode_fields(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.product_uri.encode(buf)?;
        self.manufacturer_name.encode(buf)?;
        self.product_name.encode(buf)?;
        self.software_version.encode(buf)?;
        self.build_number.encode(buf)?;
        self.build_date.encode(buf)
    }

    fn decode_fields(&mut self, reader: &mut BinaryReader) -> Result<(), CodecError> {
        self.product_uri = BinaryDecode::decode(reader)?;
        self.manufacturer_name = BinaryDecode::decode(reader)?;
        self.product_name = BinaryDecode::decode(reader)?;
        self.software_version = BinaryDecode::decode(reader)?;
        self.build_number = BinaryDecode::decode(reader)?;
        self.build_date = DateTime::decode(reader)?;
        Ok(())
    }
}
