//! Message reassembly from chunk bodies.
//!
//! A message is sent as zero or more intermediate chunks followed by one
//! final chunk, all carrying the same request id. An abort chunk ends the
//! message early; its body explains why.
//!
//! Chunk bodies handed to [`MessageAssembler::push`] are expected to be
//! already verified and stripped of security headers.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use ua_wire::protocol::{Assembled, ChunkKind, MessageAssembler};
//!
//! let mut assembler = MessageAssembler::new(1024, 16, 8);
//!
//! let first = assembler.push(7, ChunkKind::Intermediate, Bytes::from_static(b"hello ")).unwrap();
//! assert_eq!(first, Assembled::Pending);
//!
//! let done = assembler.push(7, ChunkKind::Final, Bytes::from_static(b"world")).unwrap();
//! assert_eq!(done, Assembled::Complete(Bytes::from_static(b"hello world")));
//! ```

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tracing::{error, trace};

use super::chunk_header::ChunkKind;
use crate::config::WireConfig;
use crate::error::FramingError;

/// Outcome of pushing one chunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembled {
    /// More chunks are needed.
    Pending,
    /// The message is complete.
    Complete(Bytes),
    /// The sender aborted the message; carries the abort chunk body.
    Aborted(Bytes),
}

/// Bodies received so far for one request.
#[derive(Debug, Default)]
struct Partial {
    parts: Vec<Bytes>,
    size: usize,
}

/// Concatenates chunk bodies into messages, per request id.
#[derive(Debug)]
pub struct MessageAssembler {
    /// Incomplete messages by request id.
    partial: HashMap<u32, Partial>,
    /// Maximum message body size; 0 means unlimited.
    max_message_size: usize,
    /// Maximum chunks per message; 0 means unlimited.
    max_chunk_count: usize,
    /// Maximum incomplete messages at once; 0 means unlimited.
    max_pending_messages: usize,
}

impl MessageAssembler {
    /// Create an assembler. A limit of 0 disables that check.
    pub fn new(max_message_size: usize, max_chunk_count: usize, max_pending_messages: usize) -> Self {
        Self {
            partial: HashMap::new(),
            max_message_size,
            max_chunk_count,
            max_pending_messages,
        }
    }

    /// Create an assembler using the message limits in `config`.
    pub fn from_config(config: &WireConfig) -> Self {
        Self::new(
            config.max_message_size,
            config.max_chunk_count,
            config.max_pending_messages,
        )
    }

    /// Add one chunk body.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::MessageTooLarge`] or
    /// [`FramingError::TooManyChunks`] when a limit is crossed; the partial
    /// message is discarded. Returns [`FramingError::TooManyPendingMessages`]
    /// when an intermediate chunk would open one incomplete message too
    /// many; messages already pending are kept.
    pub fn push(&mut self, request_id: u32, kind: ChunkKind, body: Bytes) -> Result<Assembled, FramingError> {
        if kind == ChunkKind::Abort {
            if let Some(partial) = self.partial.remove(&request_id) {
                trace!(request_id, chunks = partial.parts.len(), "message aborted");
            }
            return Ok(Assembled::Aborted(body));
        }

        if kind == ChunkKind::Intermediate
            && self.max_pending_messages != 0
            && self.partial.len() >= self.max_pending_messages
            && !self.partial.contains_key(&request_id)
        {
            let e = FramingError::TooManyPendingMessages {
                count: self.partial.len() + 1,
                maximum: self.max_pending_messages,
            };
            error!(request_id, error = %e, "message limit exceeded");
            return Err(e);
        }

        let partial = self.partial.entry(request_id).or_default();
        let count = partial.parts.len() + 1;
        let size = partial.size + body.len();

        let limit = if self.max_chunk_count != 0 && count > self.max_chunk_count {
            Some(FramingError::TooManyChunks {
                count,
                maximum: self.max_chunk_count,
            })
        } else if self.max_message_size != 0 && size > self.max_message_size {
            Some(FramingError::MessageTooLarge {
                size,
                maximum: self.max_message_size,
            })
        } else {
            None
        };
        if let Some(e) = limit {
            error!(request_id, error = %e, "message limit exceeded");
            self.partial.remove(&request_id);
            return Err(e);
        }

        partial.parts.push(body);
        partial.size = size;

        if kind != ChunkKind::Final {
            return Ok(Assembled::Pending);
        }

        let mut partial = self.partial.remove(&request_id).unwrap_or_default();
        trace!(request_id, chunks = partial.parts.len(), size = partial.size, "message complete");
        if partial.parts.len() == 1 {
            return Ok(Assembled::Complete(partial.parts.pop().unwrap_or_default()));
        }

        let mut buf = BytesMut::with_capacity(partial.size);
        for part in &partial.parts {
            buf.extend_from_slice(part);
        }
        Ok(Assembled::Complete(buf.freeze()))
    }

    /// Drop an incomplete message. Returns true if one was pending.
    pub fn discard(&mut self, request_id: u32) -> bool {
        self.partial.remove(&request_id).is_some()
    }

    /// Number of incomplete messages.
    pub fn pending_count(&self) -> usize {
        self.partial.len()
    }

    /// Drop every incomplete message.
    pub fn clear(&mut self) {
        self.partial.clear();
    }
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(data: &'static [u8]) -> Bytes {
        Bytes::from_static(data)
    }

    #[test]
    fn test_single_final_is_not_copied() {
        let mut assembler = MessageAssembler::default();
        let data = body(b"one");

        match assembler.push(1, ChunkKind::Final, data.clone()).unwrap() {
            Assembled::Complete(msg) => assert_eq!(msg.as_ptr(), data.as_ptr()),
            other => panic!("expected complete, got {:?}", other),
        }
        assert_eq!(assembler.pending_count(), 0);
    }

    #[test]
    fn test_multi_chunk_message() {
        let mut assembler = MessageAssembler::default();
        assert_eq!(
            assembler.push(1, ChunkKind::Intermediate, body(b"a")).unwrap(),
            Assembled::Pending
        );
        assert_eq!(
            assembler.push(1, ChunkKind::Intermediate, body(b"b")).unwrap(),
            Assembled::Pending
        );
        assert_eq!(assembler.pending_count(), 1);
        assert_eq!(
            assembler.push(1, ChunkKind::Final, body(b"c")).unwrap(),
            Assembled::Complete(body(b"abc"))
        );
        assert_eq!(assembler.pending_count(), 0);
    }

    #[test]
    fn test_interleaved_requests() {
        let mut assembler = MessageAssembler::default();
        assembler.push(1, ChunkKind::Intermediate, body(b"1a")).unwrap();
        assembler.push(2, ChunkKind::Intermediate, body(b"2a")).unwrap();

        assert_eq!(
            assembler.push(2, ChunkKind::Final, body(b"2b")).unwrap(),
            Assembled::Complete(body(b"2a2b"))
        );
        assert_eq!(
            assembler.push(1, ChunkKind::Final, body(b"1b")).unwrap(),
            Assembled::Complete(body(b"1a1b"))
        );
    }

    #[test]
    fn test_abort_discards_partial() {
        let mut assembler = MessageAssembler::default();
        assembler.push(5, ChunkKind::Intermediate, body(b"partial")).unwrap();

        assert_eq!(
            assembler.push(5, ChunkKind::Abort, body(b"reason")).unwrap(),
            Assembled::Aborted(body(b"reason"))
        );
        assert_eq!(assembler.pending_count(), 0);

        // next message on the same id starts fresh
        assert_eq!(
            assembler.push(5, ChunkKind::Final, body(b"new")).unwrap(),
            Assembled::Complete(body(b"new"))
        );
    }

    #[test]
    fn test_message_too_large() {
        let mut assembler = MessageAssembler::new(5, 0, 0);
        assembler.push(1, ChunkKind::Intermediate, body(b"abc")).unwrap();

        assert_eq!(
            assembler.push(1, ChunkKind::Final, body(b"def")).unwrap_err(),
            FramingError::MessageTooLarge { size: 6, maximum: 5 }
        );
        assert_eq!(assembler.pending_count(), 0);
    }

    #[test]
    fn test_too_many_chunks() {
        let mut assembler = MessageAssembler::new(0, 2, 0);
        assembler.push(1, ChunkKind::Intermediate, body(b"a")).unwrap();
        assembler.push(1, ChunkKind::Intermediate, body(b"b")).unwrap();

        assert_eq!(
            assembler.push(1, ChunkKind::Final, body(b"c")).unwrap_err(),
            FramingError::TooManyChunks { count: 3, maximum: 2 }
        );
    }

    #[test]
    fn test_too_many_pending_messages() {
        let mut assembler = MessageAssembler::new(1024, 16, 3);
        for id in 0..3 {
            assembler.push(id, ChunkKind::Intermediate, body(b"x")).unwrap();
        }

        assert_eq!(
            assembler.push(3, ChunkKind::Intermediate, body(b"x")).unwrap_err(),
            FramingError::TooManyPendingMessages { count: 4, maximum: 3 }
        );
        assert_eq!(assembler.pending_count(), 3);

        // pending messages still progress, single-chunk messages still pass
        assert_eq!(
            assembler.push(0, ChunkKind::Intermediate, body(b"y")).unwrap(),
            Assembled::Pending
        );
        assert_eq!(
            assembler.push(9, ChunkKind::Final, body(b"solo")).unwrap(),
            Assembled::Complete(body(b"solo"))
        );
        assert_eq!(
            assembler.push(0, ChunkKind::Final, body(b"z")).unwrap(),
            Assembled::Complete(body(b"xyz"))
        );

        // completing one frees a slot
        assert!(assembler.push(3, ChunkKind::Intermediate, body(b"x")).is_ok());
        assert_eq!(assembler.pending_count(), 3);
    }

    #[test]
    fn test_many_distinct_requests_bounded() {
        let mut assembler = MessageAssembler::new(1024, 16, 64);
        let rejected = (0..10_000u32)
            .filter(|id| assembler.push(*id, ChunkKind::Intermediate, body(b"x")).is_err())
            .count();

        assert_eq!(rejected, 10_000 - 64);
        assert_eq!(assembler.pending_count(), 64);
    }

    #[test]
    fn test_from_config() {
        let config = WireConfig::default().with_max_pending_messages(1);
        let mut assembler = MessageAssembler::from_config(&config);
        assembler.push(1, ChunkKind::Intermediate, body(b"a")).unwrap();
        assert!(matches!(
            assembler.push(2, ChunkKind::Intermediate, body(b"b")),
            Err(FramingError::TooManyPendingMessages { .. })
        ));
    }

    #[test]
    fn test_discard_and_clear() {
        let mut assembler = MessageAssembler::default();
        assembler.push(1, ChunkKind::Intermediate, body(b"a")).unwrap();
        assembler.push(2, ChunkKind::Intermediate, body(b"b")).unwrap();

        assert!(assembler.discard(1));
        assert!(!assembler.discard(1));
        assembler.clear();
        assert_eq!(assembler.pending_count(), 0);
    }
}
