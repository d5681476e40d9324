//! Chunk header encoding and decoding.
//!
//! Implements the 8-byte transport header:
//! ```text
//! ┌──────────────┬────────┬──────────────┐
//! │ Message type │ Kind   │ Message size │
//! │ 3 bytes      │ 1 byte │ 4 bytes      │
//! │ ASCII        │ F/C/A  │ uint32 LE    │
//! └──────────────┴────────┴──────────────┘
//! ```
//!
//! The message size counts the whole chunk, header included.

use super::chunk_assembler::{HeaderRead, HeaderReader};
use crate::error::FramingError;

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Default maximum chunk size, header included.
pub const DEFAULT_MAX_CHUNK_SIZE: u32 = 65_535;

/// Message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client hello.
    Hello,
    /// Server acknowledge.
    Acknowledge,
    /// Transport error.
    Error,
    /// Reverse hello.
    ReverseHello,
    /// Open secure channel.
    OpenSecureChannel,
    /// Close secure channel.
    CloseSecureChannel,
    /// Service message.
    Message,
}

impl MessageType {
    /// Three-byte ASCII tag.
    pub const fn tag(self) -> [u8; 3] {
        match self {
            MessageType::Hello => *b"HEL",
            MessageType::Acknowledge => *b"ACK",
            MessageType::Error => *b"ERR",
            MessageType::ReverseHello => *b"RHE",
            MessageType::OpenSecureChannel => *b"OPN",
            MessageType::CloseSecureChannel => *b"CLO",
            MessageType::Message => *b"MSG",
        }
    }

    /// Parse a three-byte tag.
    pub fn from_tag(tag: [u8; 3]) -> Option<Self> {
        let ty = match &tag {
            b"HEL" => MessageType::Hello,
            b"ACK" => MessageType::Acknowledge,
            b"ERR" => MessageType::Error,
            b"RHE" => MessageType::ReverseHello,
            b"OPN" => MessageType::OpenSecureChannel,
            b"CLO" => MessageType::CloseSecureChannel,
            b"MSG" => MessageType::Message,
            _ => return None,
        };
        Some(ty)
    }

    /// Connection-level messages that are never split into chunks.
    #[inline]
    pub fn is_single_chunk(self) -> bool {
        matches!(
            self,
            MessageType::Hello | MessageType::Acknowledge | MessageType::Error | MessageType::ReverseHello
        )
    }
}

/// Chunk finality marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// Last chunk of a message (`F`).
    Final,
    /// More chunks follow (`C`).
    Intermediate,
    /// Sender abandoned the message (`A`).
    Abort,
}

impl ChunkKind {
    /// ASCII marker byte.
    pub const fn byte(self) -> u8 {
        match self {
            ChunkKind::Final => b'F',
            ChunkKind::Intermediate => b'C',
            ChunkKind::Abort => b'A',
        }
    }

    /// Parse a marker byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'F' => Some(ChunkKind::Final),
            b'C' => Some(ChunkKind::Intermediate),
            b'A' => Some(ChunkKind::Abort),
            _ => None,
        }
    }
}

/// Decoded chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Message type tag.
    pub message_type: MessageType,
    /// Finality marker.
    pub chunk_kind: ChunkKind,
    /// Total chunk length, header included.
    pub message_size: u32,
}

impl ChunkHeader {
    /// Create a new header.
    pub fn new(message_type: MessageType, chunk_kind: ChunkKind, message_size: u32) -> Self {
        Self {
            message_type,
            chunk_kind,
            message_size,
        }
    }

    /// Encode header to bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use ua_wire::protocol::{ChunkHeader, ChunkKind, MessageType};
    ///
    /// let header = ChunkHeader::new(MessageType::Message, ChunkKind::Final, 24);
    /// assert_eq!(&header.encode(), b"MSGF\x18\x00\x00\x00");
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (8 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        buf[0..3].copy_from_slice(&self.message_type.tag());
        buf[3] = self.chunk_kind.byte();
        buf[4..8].copy_from_slice(&self.message_size.to_le_bytes());
    }

    /// Decode header from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::MalformedHeader`] for a short buffer, an
    /// unknown tag or marker, or a connection-level message that is not final.
    ///
    /// # Example
    ///
    /// ```
    /// use ua_wire::protocol::{ChunkHeader, ChunkKind, MessageType};
    ///
    /// let header = ChunkHeader::decode(b"MSGC\x00\x01\x00\x00").unwrap();
    /// assert_eq!(header.message_type, MessageType::Message);
    /// assert_eq!(header.chunk_kind, ChunkKind::Intermediate);
    /// assert_eq!(header.message_size, 256);
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self, FramingError> {
        if buf.len() < HEADER_SIZE {
            return Err(FramingError::MalformedHeader(format!(
                "need {} header bytes, got {}",
                HEADER_SIZE,
                buf.len()
            )));
        }

        let tag = [buf[0], buf[1], buf[2]];
        let message_type = MessageType::from_tag(tag).ok_or_else(|| {
            FramingError::MalformedHeader(format!(
                "unknown message type {:?}",
                String::from_utf8_lossy(&tag)
            ))
        })?;
        let chunk_kind = ChunkKind::from_byte(buf[3]).ok_or_else(|| {
            FramingError::MalformedHeader(format!("unknown chunk type {:#04x}", buf[3]))
        })?;

        if message_type.is_single_chunk() && chunk_kind != ChunkKind::Final {
            return Err(FramingError::MalformedHeader(format!(
                "{:?} must be a final chunk",
                message_type
            )));
        }

        Ok(Self {
            message_type,
            chunk_kind,
            message_size: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Body length (total size minus header).
    #[inline]
    pub fn body_length(&self) -> usize {
        (self.message_size as usize).saturating_sub(HEADER_SIZE)
    }

    /// Check if this is the last chunk of its message.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.chunk_kind == ChunkKind::Final
    }

    /// Check if this chunk aborts its message.
    #[inline]
    pub fn is_abort(&self) -> bool {
        self.chunk_kind == ChunkKind::Abort
    }
}

/// [`HeaderReader`] for the 8-byte transport header.
#[derive(Debug, Clone, Copy, Default)]
pub struct UaHeaderReader;

impl HeaderReader for UaHeaderReader {
    type Info = ChunkHeader;

    fn read_header(&self, bytes: &[u8]) -> Result<HeaderRead<ChunkHeader>, FramingError> {
        let header = ChunkHeader::decode(bytes)?;
        Ok(HeaderRead {
            length: header.message_size,
            info: header,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 8);
    }

    #[test]
    fn test_encode_decode() {
        let header = ChunkHeader::new(MessageType::OpenSecureChannel, ChunkKind::Final, 132);
        let decoded = ChunkHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.body_length(), 124);
    }

    #[test]
    fn test_little_endian_size() {
        let header = ChunkHeader::new(MessageType::Message, ChunkKind::Intermediate, 0x0102_0304);
        let bytes = header.encode();
        assert_eq!(&bytes[..4], b"MSGC");
        assert_eq!(&bytes[4..], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_all_tags() {
        for ty in [
            MessageType::Hello,
            MessageType::Acknowledge,
            MessageType::Error,
            MessageType::ReverseHello,
            MessageType::OpenSecureChannel,
            MessageType::CloseSecureChannel,
            MessageType::Message,
        ] {
            assert_eq!(MessageType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(MessageType::from_tag(*b"XYZ"), None);
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            ChunkHeader::decode(b"MSGF"),
            Err(FramingError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert!(matches!(
            ChunkHeader::decode(b"FOOF\x08\x00\x00\x00"),
            Err(FramingError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_decode_unknown_kind() {
        assert!(matches!(
            ChunkHeader::decode(b"MSGX\x08\x00\x00\x00"),
            Err(FramingError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_hello_must_be_final() {
        assert!(ChunkHeader::decode(b"HELF\x20\x00\x00\x00").is_ok());
        assert!(matches!(
            ChunkHeader::decode(b"HELC\x20\x00\x00\x00"),
            Err(FramingError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_header_reader() {
        let read = UaHeaderReader.read_header(b"CLOF\x10\x00\x00\x00").unwrap();
        assert_eq!(read.length, 16);
        assert_eq!(read.info.message_type, MessageType::CloseSecureChannel);
    }
}
