//! Chunk assembler for arbitrarily fragmented transport reads.
//!
//! Implements a state machine over received fragments:
//! - `AwaitingHeader`: fewer than `minimum_header_bytes` buffered
//! - `AwaitingBody`: header parsed, waiting until `expected` bytes are buffered
//! - `Failed`: a framing error was reported; nothing more is accepted until [`reset`]
//!
//! The header layout is supplied by a [`HeaderReader`], so the assembler only
//! knows that a chunk starts with a fixed-size prefix declaring its total
//! length.
//!
//! # Aliasing
//!
//! A chunk wholly contained in one fed fragment is returned as a slice of
//! that fragment's allocation, without copying. `Bytes` is immutable, so the
//! shared memory can never change under the consumer. A chunk assembled from
//! several fragments is always copied into a fresh buffer.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use ua_wire::protocol::{ChunkAssembler, ChunkEvent};
//!
//! let mut assembler = ChunkAssembler::with_max_chunk_size(65_535);
//!
//! let chunk = Bytes::from_static(b"MSGF\x0c\x00\x00\x00body");
//! assert!(assembler.feed(chunk.slice(..5)).unwrap().is_empty());
//!
//! let events = assembler.feed(chunk.slice(5..)).unwrap();
//! assert!(matches!(&events[0], ChunkEvent::Start { .. }));
//! assert!(matches!(&events[1], ChunkEvent::Chunk(bytes) if bytes == &chunk));
//! ```
//!
//! [`reset`]: ChunkAssembler::reset

use bytes::{Bytes, BytesMut};
use tracing::{error, trace};

use super::chunk_header::{UaHeaderReader, DEFAULT_MAX_CHUNK_SIZE, HEADER_SIZE};
use crate::error::FramingError;

/// Result of reading a chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRead<I> {
    /// Total chunk length declared by the header, header included.
    pub length: u32,
    /// Protocol-specific header contents.
    pub info: I,
}

/// Parses the fixed-size prefix of a chunk.
///
/// Implemented for any `Fn(&[u8]) -> Result<HeaderRead<I>, FramingError>`.
pub trait HeaderReader {
    /// Header contents reported with [`ChunkEvent::Start`].
    type Info;

    /// Read a header from exactly `minimum_header_bytes` bytes.
    fn read_header(&self, bytes: &[u8]) -> Result<HeaderRead<Self::Info>, FramingError>;
}

impl<F, I> HeaderReader for F
where
    F: Fn(&[u8]) -> Result<HeaderRead<I>, FramingError>,
{
    type Info = I;

    fn read_header(&self, bytes: &[u8]) -> Result<HeaderRead<I>, FramingError> {
        self(bytes)
    }
}

/// Event produced while feeding fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent<I> {
    /// A header was parsed and a new chunk started.
    Start {
        /// Header contents.
        info: I,
        /// The header bytes.
        header: Bytes,
    },
    /// A complete chunk, header included.
    Chunk(Bytes),
}

/// Assembly state.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header.
    AwaitingHeader,
    /// Header parsed, waiting until `expected` bytes are buffered.
    AwaitingBody { expected: usize },
    /// A framing error was reported.
    Failed(FramingError),
}

/// Reconstructs complete chunks from transport fragments.
pub struct ChunkAssembler<H: HeaderReader> {
    /// Header parser.
    reader: H,
    /// Bytes needed before the header can be parsed.
    minimum_header_bytes: usize,
    /// Maximum declared chunk length accepted.
    max_chunk_size: usize,
    /// Fragments of the current, incomplete chunk.
    fragments: Vec<Bytes>,
    /// Sum of `fragments` lengths.
    current_length: usize,
    /// Current state.
    state: State,
}

impl<H: HeaderReader> ChunkAssembler<H> {
    /// Create an assembler with a custom header reader.
    ///
    /// # Panics
    ///
    /// Panics if `minimum_header_bytes` is 0 or `max_chunk_size` is smaller
    /// than `minimum_header_bytes`.
    pub fn new(reader: H, minimum_header_bytes: usize, max_chunk_size: usize) -> Self {
        assert!(minimum_header_bytes > 0, "minimum header size must be at least 1");
        assert!(
            max_chunk_size >= minimum_header_bytes,
            "max chunk size {} is smaller than the header size {}",
            max_chunk_size,
            minimum_header_bytes
        );
        Self {
            reader,
            minimum_header_bytes,
            max_chunk_size,
            fragments: Vec::new(),
            current_length: 0,
            state: State::AwaitingHeader,
        }
    }

    /// Feed a fragment and collect the events it completes.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::ChunkTooSmall`] or
    /// [`FramingError::ChunkSizeExceeded`] when a header declares an
    /// out-of-range length, or whatever the header reader rejects. After an
    /// error the assembler keeps returning it until [`reset`](Self::reset);
    /// events completed earlier in the failing call are dropped.
    pub fn feed(&mut self, fragment: Bytes) -> Result<Vec<ChunkEvent<H::Info>>, FramingError> {
        if let State::Failed(e) = &self.state {
            return Err(e.clone());
        }

        let mut events = Vec::new();
        match self.process(fragment, &mut events) {
            Ok(()) => Ok(events),
            Err(e) => {
                error!(error = %e, "chunk framing failed");
                self.fragments.clear();
                self.current_length = 0;
                self.state = State::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Copy `data` and feed it.
    ///
    /// Chunks returned from here never alias caller memory.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<ChunkEvent<H::Info>>, FramingError> {
        self.feed(Bytes::copy_from_slice(data))
    }

    fn process(
        &mut self,
        mut fragment: Bytes,
        events: &mut Vec<ChunkEvent<H::Info>>,
    ) -> Result<(), FramingError> {
        while !fragment.is_empty() {
            if let State::AwaitingHeader = self.state {
                if self.current_length + fragment.len() < self.minimum_header_bytes {
                    self.buffer(fragment);
                    return Ok(());
                }
                self.start_chunk(&fragment, events)?;
            }

            let expected = match self.state {
                State::AwaitingBody { expected } => expected,
                _ => return Ok(()),
            };

            let needed = expected - self.current_length;
            if fragment.len() < needed {
                self.buffer(fragment);
                return Ok(());
            }

            // Fragment may span two chunks; `fragment` keeps the tail.
            let head = fragment.split_to(needed);
            self.buffer(head);
            let chunk = self.take_chunk();
            trace!(length = chunk.len(), "chunk complete");
            events.push(ChunkEvent::Chunk(chunk));
            self.state = State::AwaitingHeader;
        }
        Ok(())
    }

    /// Parse the header from buffered bytes plus the start of `fragment`.
    fn start_chunk(
        &mut self,
        fragment: &Bytes,
        events: &mut Vec<ChunkEvent<H::Info>>,
    ) -> Result<(), FramingError> {
        let min = self.minimum_header_bytes;
        let header = if self.fragments.is_empty() {
            fragment.slice(..min)
        } else {
            let mut buf = BytesMut::with_capacity(min);
            for f in &self.fragments {
                buf.extend_from_slice(f);
            }
            let missing = min - buf.len();
            buf.extend_from_slice(&fragment[..missing]);
            buf.freeze()
        };

        let HeaderRead { length, info } = self.reader.read_header(&header)?;
        let declared = length as usize;
        if declared < min {
            return Err(FramingError::ChunkTooSmall {
                declared,
                minimum: min,
            });
        }
        if declared > self.max_chunk_size {
            return Err(FramingError::ChunkSizeExceeded {
                declared,
                maximum: self.max_chunk_size,
            });
        }

        trace!(length = declared, "chunk started");
        events.push(ChunkEvent::Start { info, header });
        self.state = State::AwaitingBody { expected: declared };
        Ok(())
    }

    fn buffer(&mut self, fragment: Bytes) {
        if !fragment.is_empty() {
            self.current_length += fragment.len();
            self.fragments.push(fragment);
        }
    }

    /// Take the buffered fragments as one chunk.
    fn take_chunk(&mut self) -> Bytes {
        self.current_length = 0;
        if self.fragments.len() == 1 {
            return self.fragments.pop().unwrap_or_default();
        }

        let total = self.fragments.iter().map(Bytes::len).sum();
        let mut buf = BytesMut::with_capacity(total);
        for f in self.fragments.drain(..) {
            buf.extend_from_slice(&f);
        }
        buf.freeze()
    }

    /// Discard buffered data and clear a failure.
    pub fn reset(&mut self) {
        self.fragments.clear();
        self.current_length = 0;
        self.state = State::AwaitingHeader;
    }

    /// Bytes buffered toward the current chunk.
    pub fn buffered_len(&self) -> usize {
        self.current_length
    }

    /// True when no partial chunk is buffered.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::AwaitingHeader) && self.current_length == 0
    }

    /// The error that poisoned the assembler, if any.
    pub fn failure(&self) -> Option<&FramingError> {
        match &self.state {
            State::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Bytes needed before a header can be parsed.
    pub fn minimum_header_bytes(&self) -> usize {
        self.minimum_header_bytes
    }

    /// Maximum accepted chunk length.
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::AwaitingHeader => "AwaitingHeader",
            State::AwaitingBody { .. } => "AwaitingBody",
            State::Failed(_) => "Failed",
        }
    }
}

impl ChunkAssembler<UaHeaderReader> {
    /// Assembler for the 8-byte transport header.
    pub fn with_max_chunk_size(max_chunk_size: u32) -> Self {
        Self::new(
            UaHeaderReader,
            HEADER_SIZE,
            (max_chunk_size as usize).max(HEADER_SIZE),
        )
    }
}

impl Default for ChunkAssembler<UaHeaderReader> {
    fn default() -> Self {
        Self::with_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE)
    }
}

impl<H: HeaderReader> std::fmt::Debug for ChunkAssembler<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkAssembler")
            .field("minimum_header_bytes", &self.minimum_header_bytes)
            .field("max_chunk_size", &self.max_chunk_size)
            .field("current_length", &self.current_length)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChunkHeader, ChunkKind, MessageType};

    /// Five-byte test header: one tag byte and a u32 LE total length.
    fn five_byte_header(bytes: &[u8]) -> Result<HeaderRead<u8>, FramingError> {
        Ok(HeaderRead {
            length: u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
            info: bytes[0],
        })
    }

    type TestReader = fn(&[u8]) -> Result<HeaderRead<u8>, FramingError>;

    fn test_assembler(max: usize) -> ChunkAssembler<TestReader> {
        ChunkAssembler::new(five_byte_header as TestReader, 5, max)
    }

    fn test_chunk(tag: u8, total: usize) -> Vec<u8> {
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&(total as u32).to_le_bytes());
        bytes.extend((5..total).map(|i| i as u8));
        bytes
    }

    fn chunks(events: &[ChunkEvent<u8>]) -> Vec<Bytes> {
        events
            .iter()
            .filter_map(|e| match e {
                ChunkEvent::Chunk(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    fn ua_chunk(kind: ChunkKind, body: &[u8]) -> Vec<u8> {
        let header = ChunkHeader::new(MessageType::Message, kind, (HEADER_SIZE + body.len()) as u32);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn test_three_way_split() {
        let mut assembler = test_assembler(1024);
        let chunk = test_chunk(7, 50);

        let mut events = Vec::new();
        events.extend(assembler.push(&chunk[..17]).unwrap());
        events.extend(assembler.push(&chunk[17..20]).unwrap());
        events.extend(assembler.push(&chunk[20..]).unwrap());

        let out = chunks(&events);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 50);
        assert_eq!(&out[0][..], &chunk[..]);
        assert!(assembler.is_idle());
    }

    #[test]
    fn test_start_event_precedes_chunk() {
        let mut assembler = test_assembler(1024);
        let chunk = test_chunk(9, 12);

        let events = assembler.push(&chunk[..6]).unwrap();
        assert_eq!(
            events,
            vec![ChunkEvent::Start {
                info: 9,
                header: Bytes::copy_from_slice(&chunk[..5]),
            }]
        );
        assert_eq!(assembler.state_name(), "AwaitingBody");

        let events = assembler.push(&chunk[6..]).unwrap();
        assert_eq!(chunks(&events).len(), 1);
    }

    #[test]
    fn test_chunk_size_exceeded() {
        let mut assembler = test_assembler(1024);
        let mut header = vec![1];
        header.extend_from_slice(&2000u32.to_le_bytes());

        let err = assembler.push(&header).unwrap_err();
        assert_eq!(
            err,
            FramingError::ChunkSizeExceeded {
                declared: 2000,
                maximum: 1024
            }
        );
        assert_eq!(assembler.state_name(), "Failed");
    }

    #[test]
    fn test_chunk_too_small() {
        let mut assembler = test_assembler(1024);
        let err = assembler.push(&[1, 3, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            FramingError::ChunkTooSmall {
                declared: 3,
                minimum: 5
            }
        );
    }

    #[test]
    fn test_failure_is_sticky_until_reset() {
        let mut assembler = test_assembler(64);
        let mut bad = vec![1];
        bad.extend_from_slice(&100u32.to_le_bytes());
        let err = assembler.push(&bad).unwrap_err();

        // valid data is refused while poisoned
        assert_eq!(assembler.push(&test_chunk(1, 10)).unwrap_err(), err);
        assert_eq!(assembler.failure(), Some(&err));

        assembler.reset();
        assert!(assembler.failure().is_none());
        let events = assembler.push(&test_chunk(1, 10)).unwrap();
        assert_eq!(chunks(&events).len(), 1);
    }

    #[test]
    fn test_error_drops_earlier_chunks_in_same_feed() {
        let mut assembler = test_assembler(64);
        let mut data = test_chunk(1, 10);
        data.push(2);
        data.extend_from_slice(&500u32.to_le_bytes());

        assert!(assembler.push(&data).is_err());
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn test_single_fragment_is_not_copied() {
        let mut assembler = test_assembler(1024);
        let fragment = Bytes::from(test_chunk(1, 40));

        let events = assembler.feed(fragment.clone()).unwrap();
        let out = chunks(&events);
        assert_eq!(out[0], fragment);
        assert_eq!(out[0].as_ptr(), fragment.as_ptr());
    }

    #[test]
    fn test_chunks_sliced_from_shared_fragment() {
        let mut assembler = test_assembler(1024);
        let mut data = test_chunk(1, 20);
        data.extend(test_chunk(2, 30));
        let fragment = Bytes::from(data);

        let out = chunks(&assembler.feed(fragment.clone()).unwrap());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ptr(), fragment.as_ptr());
        assert_eq!(out[1].as_ptr(), fragment[20..].as_ptr());
    }

    #[test]
    fn test_multi_fragment_is_copied() {
        let mut assembler = test_assembler(1024);
        let fragment = Bytes::from(test_chunk(1, 40));

        assembler.feed(fragment.slice(..25)).unwrap();
        let out = chunks(&assembler.feed(fragment.slice(25..)).unwrap());

        assert_eq!(out[0], fragment);
        assert_ne!(out[0].as_ptr(), fragment.as_ptr());
    }

    #[test]
    fn test_push_never_aliases_input() {
        let mut assembler = test_assembler(1024);
        let mut data = test_chunk(1, 16);

        let out = chunks(&assembler.push(&data).unwrap());
        data[10] = 0xFF;

        assert_eq!(out[0][10], 10);
    }

    #[test]
    fn test_header_spread_over_fragments() {
        let mut assembler = test_assembler(1024);
        let chunk = test_chunk(4, 9);

        assert!(assembler.push(&chunk[..2]).unwrap().is_empty());
        assert!(assembler.push(&chunk[2..4]).unwrap().is_empty());
        assert_eq!(assembler.state_name(), "AwaitingHeader");
        assert_eq!(assembler.buffered_len(), 4);

        let events = assembler.push(&chunk[4..]).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(&chunks(&events)[0][..], &chunk[..]);
    }

    #[test]
    fn test_header_only_chunk() {
        let mut assembler = test_assembler(1024);
        let out = chunks(&assembler.push(&[3, 5, 0, 0, 0]).unwrap());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 5);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut assembler = test_assembler(1024);
        let mut data = test_chunk(1, 11);
        data.extend(test_chunk(2, 7));

        let mut events = Vec::new();
        for byte in &data {
            events.extend(assembler.push(&[*byte]).unwrap());
        }

        let out = chunks(&events);
        assert_eq!(out.len(), 2);
        assert_eq!(&out[0][..], &data[..11]);
        assert_eq!(&out[1][..], &data[11..]);
    }

    #[test]
    fn test_empty_fragment_is_ignored() {
        let mut assembler = test_assembler(1024);
        assert!(assembler.feed(Bytes::new()).unwrap().is_empty());
        assert!(assembler.is_idle());
    }

    #[test]
    fn test_closure_header_reader() {
        let mut assembler = ChunkAssembler::new(
            |bytes: &[u8]| -> Result<HeaderRead<()>, FramingError> {
                Ok(HeaderRead {
                    length: u32::from(bytes[0]),
                    info: (),
                })
            },
            1,
            255,
        );
        let events = assembler.push(&[3, 0xAA, 0xBB]).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_ua_header_chunks() {
        let mut assembler = ChunkAssembler::with_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE);
        let data = ua_chunk(ChunkKind::Final, b"payload");

        let events = assembler.push(&data).unwrap();
        match &events[0] {
            ChunkEvent::Start { info, .. } => {
                assert_eq!(info.message_type, MessageType::Message);
                assert_eq!(info.message_size, 15);
            }
            other => panic!("expected start, got {:?}", other),
        }
        assert_eq!(events[1], ChunkEvent::Chunk(Bytes::from(data)));
    }

    #[test]
    fn test_ua_malformed_header() {
        let mut assembler = ChunkAssembler::with_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE);
        assert!(matches!(
            assembler.push(b"XXXF\x10\x00\x00\x00"),
            Err(FramingError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_ua_max_chunk_size() {
        let mut assembler = ChunkAssembler::with_max_chunk_size(16);
        let err = assembler
            .push(&ua_chunk(ChunkKind::Final, &[0; 9]))
            .unwrap_err();
        assert_eq!(
            err,
            FramingError::ChunkSizeExceeded {
                declared: 17,
                maximum: 16
            }
        );
    }

    #[test]
    #[should_panic(expected = "smaller than the header size")]
    fn test_max_below_header_panics() {
        let _ = test_assembler(4);
    }
}
