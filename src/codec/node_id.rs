//! Node identifiers.
//!
//! A [`NodeId`] is a namespace index plus an identifier. On the wire the
//! encoding byte selects the most compact form that fits:
//!
//! ```text
//! 0x00  two-byte    [0x00][id:u8]                 ns == 0, id <= 255
//! 0x01  four-byte   [0x01][ns:u8][id:u16]         ns <= 255, id <= 65535
//! 0x02  numeric     [0x02][ns:u16][id:u32]
//! 0x03  string      [0x03][ns:u16][len:i32][utf8]
//! 0x04  guid        [0x04][ns:u16][16 bytes]
//! 0x05  opaque      [0x05][ns:u16][len:i32][bytes]
//! ```

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Serialize, Serializer};

use super::binary::{write_byte_string, write_string, BinaryDecode, BinaryEncode, BinaryReader};
use crate::error::CodecError;

const TWO_BYTE: u8 = 0x00;
const FOUR_BYTE: u8 = 0x01;
const NUMERIC: u8 = 0x02;
const STRING: u8 = 0x03;
const GUID: u8 = 0x04;
const OPAQUE: u8 = 0x05;

/// Identifier part of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// Guid in wire byte order.
    Guid([u8; 16]),
    /// Opaque byte string identifier.
    Opaque(Bytes),
}

/// Namespace-qualified node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    /// Namespace index. 0 is the standard namespace.
    pub namespace: u16,
    /// Identifier within the namespace.
    pub identifier: Identifier,
}

impl NodeId {
    /// The null node id (`i=0`).
    pub const NULL: NodeId = NodeId::numeric(0, 0);

    /// Create a numeric node id.
    pub const fn numeric(namespace: u16, id: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(id),
        }
    }

    /// Create a string node id.
    pub fn string(namespace: u16, id: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(id.into()),
        }
    }

    /// Create a guid node id.
    pub const fn guid(namespace: u16, id: [u8; 16]) -> Self {
        Self {
            namespace,
            identifier: Identifier::Guid(id),
        }
    }

    /// Create an opaque node id.
    pub fn opaque(namespace: u16, id: impl Into<Bytes>) -> Self {
        Self {
            namespace,
            identifier: Identifier::Opaque(id.into()),
        }
    }

    /// True for `ns=0;i=0`.
    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier == Identifier::Numeric(0)
    }

    /// Numeric identifier value, if this is a numeric node id.
    pub fn as_numeric(&self) -> Option<u32> {
        match self.identifier {
            Identifier::Numeric(id) => Some(id),
            _ => None,
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::NULL
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        match &self.identifier {
            Identifier::Numeric(id) => write!(f, "i={}", id),
            Identifier::String(id) => write!(f, "s={}", id),
            Identifier::Guid(id) => {
                f.write_str("g=")?;
                for b in id {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Identifier::Opaque(id) => {
                f.write_str("b=")?;
                for b in id.iter() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl BinaryEncode for NodeId {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match &self.identifier {
            Identifier::Numeric(id) if self.namespace == 0 && *id <= 0xFF => {
                buf.put_u8(TWO_BYTE);
                buf.put_u8(*id as u8);
            }
            Identifier::Numeric(id) if self.namespace <= 0xFF && *id <= 0xFFFF => {
                buf.put_u8(FOUR_BYTE);
                buf.put_u8(self.namespace as u8);
                buf.put_u16_le(*id as u16);
            }
            Identifier::Numeric(id) => {
                buf.put_u8(NUMERIC);
                buf.put_u16_le(self.namespace);
                buf.put_u32_le(*id);
            }
            Identifier::String(id) => {
                buf.put_u8(STRING);
                buf.put_u16_le(self.namespace);
                write_string(buf, Some(id.as_str()))?;
            }
            Identifier::Guid(id) => {
                buf.put_u8(GUID);
                buf.put_u16_le(self.namespace);
                buf.put_slice(id);
            }
            Identifier::Opaque(id) => {
                buf.put_u8(OPAQUE);
                buf.put_u16_le(self.namespace);
                write_byte_string(buf, Some(&id[..]))?;
            }
        }
        Ok(())
    }
}

impl BinaryDecode for NodeId {
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        let encoding = reader.read_u8()?;
        let node_id = match encoding {
            TWO_BYTE => NodeId::numeric(0, u32::from(reader.read_u8()?)),
            FOUR_BYTE => {
                let namespace = u16::from(reader.read_u8()?);
                NodeId::numeric(namespace, u32::from(reader.read_u16()?))
            }
            NUMERIC => {
                let namespace = reader.read_u16()?;
                NodeId::numeric(namespace, reader.read_u32()?)
            }
            STRING => {
                let namespace = reader.read_u16()?;
                NodeId::string(namespace, reader.read_string()?.unwrap_or_default())
            }
            GUID => {
                let namespace = reader.read_u16()?;
                NodeId::guid(namespace, reader.read_array::<16>()?)
            }
            OPAQUE => {
                let namespace = reader.read_u16()?;
                NodeId::opaque(namespace, reader.read_byte_string()?.unwrap_or_default())
            }
            other => return Err(CodecError::InvalidNodeIdEncoding(other)),
        };
        Ok(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(id: &NodeId) -> BytesMut {
        let mut buf = BytesMut::new();
        id.encode(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_compact_forms_selected() {
        assert_eq!(&encode(&NodeId::numeric(0, 72))[..], &[0x00, 72]);
        assert_eq!(
            &encode(&NodeId::numeric(2, 500))[..],
            &[0x01, 2, 0xF4, 0x01]
        );
        assert_eq!(
            &encode(&NodeId::numeric(300, 70_000))[..],
            &[0x02, 0x2C, 0x01, 0x70, 0x11, 0x01, 0x00]
        );
    }

    #[test]
    fn test_all_identifier_kinds_decode() {
        let ids = [
            NodeId::NULL,
            NodeId::numeric(0, 886),
            NodeId::numeric(7, 0xFFFF_FFFF),
            NodeId::string(3, "Boiler.Temperature"),
            NodeId::guid(4, [0xAB; 16]),
            NodeId::opaque(5, Bytes::from_static(&[1, 2, 3])),
        ];

        let mut buf = BytesMut::new();
        for id in &ids {
            id.encode(&mut buf).unwrap();
        }

        let mut reader = BinaryReader::new(buf.freeze());
        for id in &ids {
            assert_eq!(&NodeId::decode(&mut reader).unwrap(), id);
        }
        assert!(reader.is_empty());
    }

    #[test]
    fn test_invalid_encoding_byte() {
        let mut reader = BinaryReader::from_slice(&[0x09, 0, 0]);
        assert_eq!(
            NodeId::decode(&mut reader).unwrap_err(),
            CodecError::InvalidNodeIdEncoding(0x09)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId::numeric(0, 886).to_string(), "i=886");
        assert_eq!(NodeId::numeric(2, 500).to_string(), "ns=2;i=500");
        assert_eq!(NodeId::string(1, "Pump").to_string(), "ns=1;s=Pump");
        assert_eq!(
            NodeId::opaque(1, Bytes::from_static(&[0xDE, 0xAD])).to_string(),
            "ns=1;b=dead"
        );
    }

    #[test]
    fn test_null() {
        assert!(NodeId::NULL.is_null());
        assert!(NodeId::default().is_null());
        assert!(!NodeId::numeric(1, 0).is_null());
    }
}
