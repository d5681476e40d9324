//! Complete chunks, inbound and outbound.
//!
//! [`MessageChunk`] is a validated view over a chunk delivered by the
//! assembler. [`OutboundChunk`] keeps header and body apart so they can be
//! written with one vectored write.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use ua_wire::protocol::{split_message, MessageType};
//!
//! let body = Bytes::from(vec![7u8; 100]);
//! let chunks = split_message(MessageType::Message, body, 48).unwrap();
//!
//! assert_eq!(chunks.len(), 3);
//! assert!(chunks.iter().all(|c| c.size() <= 48));
//! assert!(chunks[2].header().unwrap().is_final());
//! ```

use bytes::Bytes;

use super::chunk_header::{ChunkHeader, ChunkKind, MessageType, HEADER_SIZE};
use crate::error::FramingError;

/// A complete received chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChunk {
    /// Decoded header.
    pub header: ChunkHeader,
    /// The whole chunk, header included.
    data: Bytes,
}

impl MessageChunk {
    /// Validate a complete chunk buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::MalformedHeader`] if the header cannot be
    /// read or the buffer length differs from the declared size.
    pub fn from_bytes(data: Bytes) -> Result<Self, FramingError> {
        let header = ChunkHeader::decode(&data)?;
        if header.message_size as usize != data.len() {
            return Err(FramingError::MalformedHeader(format!(
                "header declares {} bytes, chunk has {}",
                header.message_size,
                data.len()
            )));
        }
        Ok(Self { header, data })
    }

    /// Message type tag.
    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// Finality marker.
    #[inline]
    pub fn chunk_kind(&self) -> ChunkKind {
        self.header.chunk_kind
    }

    /// Check if this is the last chunk of its message.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.header.is_final()
    }

    /// Check if this chunk aborts its message.
    #[inline]
    pub fn is_abort(&self) -> bool {
        self.header.is_abort()
    }

    /// Body bytes after the header.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.data[HEADER_SIZE..]
    }

    /// Body as `Bytes` (cheap, zero-copy).
    #[inline]
    pub fn body_bytes(&self) -> Bytes {
        self.data.slice(HEADER_SIZE..)
    }

    /// The whole chunk.
    #[inline]
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Total chunk length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the buffer is empty. A validated chunk never is.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume into the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// A chunk ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundChunk {
    /// Pre-encoded header.
    pub header: [u8; HEADER_SIZE],
    /// Body bytes.
    pub body: Bytes,
}

impl OutboundChunk {
    /// Create an outbound chunk. The header size field is filled in from
    /// the body length.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::ChunkSizeExceeded`] if the chunk cannot be
    /// described by a 32-bit size.
    pub fn new(message_type: MessageType, kind: ChunkKind, body: Bytes) -> Result<Self, FramingError> {
        let size = chunk_size(body.len())?;
        Ok(Self {
            header: ChunkHeader::new(message_type, kind, size).encode(),
            body,
        })
    }

    /// Total size of this chunk (header + body).
    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Decode the pre-encoded header.
    pub fn header(&self) -> Result<ChunkHeader, FramingError> {
        ChunkHeader::decode(&self.header)
    }
}

/// Build a complete chunk as a single byte vector.
///
/// Use [`OutboundChunk`] for vectored writes.
///
/// # Example
///
/// ```
/// use ua_wire::protocol::{build_chunk, ChunkKind, MessageType, HEADER_SIZE};
///
/// let bytes = build_chunk(MessageType::Message, ChunkKind::Final, b"hello").unwrap();
/// assert_eq!(bytes.len(), HEADER_SIZE + 5);
/// ```
pub fn build_chunk(message_type: MessageType, kind: ChunkKind, body: &[u8]) -> Result<Vec<u8>, FramingError> {
    let size = chunk_size(body.len())?;
    let mut buf = Vec::with_capacity(size as usize);
    buf.extend_from_slice(&ChunkHeader::new(message_type, kind, size).encode());
    buf.extend_from_slice(body);
    Ok(buf)
}

/// Total chunk size for a body, as the 32-bit header field.
fn chunk_size(body_len: usize) -> Result<u32, FramingError> {
    let total = HEADER_SIZE + body_len;
    u32::try_from(total).map_err(|_| FramingError::ChunkSizeExceeded {
        declared: total,
        maximum: u32::MAX as usize,
    })
}

/// Split a message body into chunks no larger than `max_chunk_size`.
///
/// Every chunk but the last is intermediate. An empty body gives one empty
/// final chunk. Bodies are sliced from `body` without copying.
///
/// # Errors
///
/// Returns [`FramingError::ChunkTooSmall`] if `max_chunk_size` leaves no
/// room for a body byte, or [`FramingError::ChunkSizeExceeded`] if a
/// connection-level message would need more than one chunk.
pub fn split_message(
    message_type: MessageType,
    body: Bytes,
    max_chunk_size: usize,
) -> Result<Vec<OutboundChunk>, FramingError> {
    if max_chunk_size <= HEADER_SIZE {
        return Err(FramingError::ChunkTooSmall {
            declared: max_chunk_size,
            minimum: HEADER_SIZE + 1,
        });
    }

    let max_body = max_chunk_size - HEADER_SIZE;
    if message_type.is_single_chunk() && body.len() > max_body {
        return Err(FramingError::ChunkSizeExceeded {
            declared: HEADER_SIZE + body.len(),
            maximum: max_chunk_size,
        });
    }

    if body.is_empty() {
        return Ok(vec![OutboundChunk::new(message_type, ChunkKind::Final, body)?]);
    }

    let count = body.len().div_ceil(max_body);
    let mut chunks = Vec::with_capacity(count);
    let mut offset = 0;
    while offset < body.len() {
        let end = (offset + max_body).min(body.len());
        let kind = if end == body.len() {
            ChunkKind::Final
        } else {
            ChunkKind::Intermediate
        };
        chunks.push(OutboundChunk::new(message_type, kind, body.slice(offset..end))?);
        offset = end;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_chunk_from_bytes() {
        let bytes = build_chunk(MessageType::Message, ChunkKind::Final, b"hello").unwrap();
        let chunk = MessageChunk::from_bytes(Bytes::from(bytes)).unwrap();

        assert_eq!(chunk.message_type(), MessageType::Message);
        assert!(chunk.is_final());
        assert!(!chunk.is_abort());
        assert_eq!(chunk.body(), b"hello");
        assert_eq!(chunk.len(), HEADER_SIZE + 5);
    }

    #[test]
    fn test_message_chunk_length_mismatch() {
        let mut bytes = build_chunk(MessageType::Message, ChunkKind::Final, b"hello").unwrap();
        bytes.push(0);
        assert!(matches!(
            MessageChunk::from_bytes(Bytes::from(bytes)),
            Err(FramingError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_body_bytes_zero_copy() {
        let original = Bytes::from(build_chunk(MessageType::Message, ChunkKind::Final, b"data").unwrap());
        let chunk = MessageChunk::from_bytes(original.clone()).unwrap();

        assert_eq!(chunk.body_bytes().as_ptr(), original[HEADER_SIZE..].as_ptr());
        assert_eq!(chunk.into_bytes(), original);
    }

    #[test]
    fn test_outbound_chunk() {
        let chunk = OutboundChunk::new(
            MessageType::CloseSecureChannel,
            ChunkKind::Final,
            Bytes::from_static(b"abc"),
        )
        .unwrap();
        assert_eq!(chunk.size(), HEADER_SIZE + 3);

        let header = chunk.header().unwrap();
        assert_eq!(header.message_size, 11);
        assert_eq!(header.message_type, MessageType::CloseSecureChannel);
    }

    #[test]
    fn test_build_chunk_roundtrip() {
        let bytes = build_chunk(MessageType::OpenSecureChannel, ChunkKind::Intermediate, &[1; 10]).unwrap();
        let header = ChunkHeader::decode(&bytes).unwrap();
        assert_eq!(header.message_size as usize, bytes.len());
        assert_eq!(header.chunk_kind, ChunkKind::Intermediate);
    }

    #[test]
    fn test_split_exact_multiple() {
        let body = Bytes::from(vec![1u8; 40]);
        let chunks = split_message(MessageType::Message, body.clone(), 28).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].header().unwrap().chunk_kind, ChunkKind::Intermediate);
        assert_eq!(chunks[1].header().unwrap().chunk_kind, ChunkKind::Final);
        assert_eq!(chunks[0].body.as_ptr(), body.as_ptr());

        let rejoined: Vec<u8> = chunks.iter().flat_map(|c| c.body.iter().copied()).collect();
        assert_eq!(rejoined, body.to_vec());
    }

    #[test]
    fn test_split_empty_body() {
        let chunks = split_message(MessageType::Message, Bytes::new(), 64).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].header().unwrap().is_final());
        assert_eq!(chunks[0].size(), HEADER_SIZE);
    }

    #[test]
    fn test_split_rejects_tiny_max() {
        assert_eq!(
            split_message(MessageType::Message, Bytes::from_static(b"x"), HEADER_SIZE).unwrap_err(),
            FramingError::ChunkTooSmall {
                declared: HEADER_SIZE,
                minimum: HEADER_SIZE + 1
            }
        );
    }

    #[test]
    fn test_split_hello_must_fit() {
        let err = split_message(MessageType::Hello, Bytes::from(vec![0; 100]), 64).unwrap_err();
        assert!(matches!(err, FramingError::ChunkSizeExceeded { .. }));
    }
}
