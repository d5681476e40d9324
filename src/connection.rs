//! Async transport adapter.
//!
//! [`ChunkReader`] pulls reads from any `AsyncRead` through a
//! [`ChunkAssembler`] and yields validated [`MessageChunk`]s.
//! [`write_chunks`] writes a batch of [`OutboundChunk`]s with vectored
//! writes.
//!
//! ```text
//! AsyncRead ─► read_buf ─► ChunkAssembler ─► MessageChunk ─► caller
//! caller ─► split_message ─► OutboundChunk[] ─► write_vectored ─► AsyncWrite
//! ```
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use ua_wire::connection::{write_chunks, ChunkReader};
//! use ua_wire::protocol::{split_message, MessageType};
//! use ua_wire::WireConfig;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ua_wire::Result<()> {
//! let (client, server) = tokio::io::duplex(1024);
//! let mut client = client;
//!
//! let chunks = split_message(MessageType::Message, Bytes::from_static(b"hello"), 64)?;
//! write_chunks(&mut client, &chunks).await?;
//!
//! let mut reader = ChunkReader::new(server, &WireConfig::default());
//! let chunk = reader.next_chunk().await?.unwrap();
//! assert_eq!(chunk.body(), b"hello");
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::io::IoSlice;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

use crate::config::WireConfig;
use crate::error::{Result, UaWireError};
use crate::protocol::{
    ChunkAssembler, ChunkEvent, MessageChunk, OutboundChunk, UaHeaderReader, HEADER_SIZE,
};

/// Reads complete chunks from a byte stream.
pub struct ChunkReader<R> {
    reader: R,
    assembler: ChunkAssembler<UaHeaderReader>,
    read_buf: BytesMut,
    read_size: usize,
    ready: VecDeque<MessageChunk>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Wrap a reader using the limits in `config`.
    pub fn new(reader: R, config: &WireConfig) -> Self {
        let read_size = config.read_buffer_size.max(1);
        Self {
            reader,
            assembler: ChunkAssembler::with_max_chunk_size(config.max_chunk_size),
            read_buf: BytesMut::with_capacity(read_size),
            read_size,
            ready: VecDeque::new(),
            eof: false,
        }
    }

    /// Next complete chunk.
    ///
    /// Returns `Ok(None)` once the stream ends cleanly between chunks.
    ///
    /// # Errors
    ///
    /// - [`UaWireError::ConnectionClosed`] if the stream ends inside a chunk
    /// - [`UaWireError::Framing`] on an invalid header; the connection must
    ///   be closed
    /// - [`UaWireError::Io`] on transport errors
    pub async fn next_chunk(&mut self) -> Result<Option<MessageChunk>> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Ok(Some(chunk));
            }
            if self.eof {
                return Ok(None);
            }

            self.read_buf.reserve(self.read_size);
            let n = match self.reader.read_buf(&mut self.read_buf).await {
                Ok(n) => n,
                Err(e) => {
                    error!(error = %e, "transport read failed");
                    return Err(UaWireError::Io(e));
                }
            };

            if n == 0 {
                self.eof = true;
                if !self.assembler.is_idle() {
                    error!(
                        buffered = self.assembler.buffered_len(),
                        "connection closed inside a chunk"
                    );
                    return Err(UaWireError::ConnectionClosed);
                }
                debug!("connection closed");
                return Ok(None);
            }

            let fragment = self.read_buf.split().freeze();
            for event in self.assembler.feed(fragment)? {
                if let ChunkEvent::Chunk(bytes) = event {
                    self.ready.push_back(MessageChunk::from_bytes(bytes)?);
                }
            }
        }
    }

    /// The assembler state, for diagnostics.
    pub fn assembler(&self) -> &ChunkAssembler<UaHeaderReader> {
        &self.assembler
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Unwrap the underlying reader. Buffered data is dropped.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Write a batch of chunks and flush.
///
/// Uses `write_vectored` for the whole batch and continues after partial
/// writes.
pub async fn write_chunks<W>(writer: &mut W, batch: &[OutboundChunk]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let total_size: usize = batch.iter().map(OutboundChunk::size).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        if slices.is_empty() {
            break;
        }

        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(UaWireError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build IoSlice array for remaining data after a partial write.
fn build_remaining_slices(batch: &[OutboundChunk], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for chunk in batch {
        let header_end = offset + HEADER_SIZE;
        if skip_bytes < header_end {
            let start = skip_bytes.saturating_sub(offset);
            slices.push(IoSlice::new(&chunk.header[start..]));
        }
        offset = header_end;

        if !chunk.body.is_empty() {
            let body_end = offset + chunk.body.len();
            if skip_bytes < body_end {
                let start = skip_bytes.saturating_sub(offset);
                slices.push(IoSlice::new(&chunk.body[start..]));
            }
            offset = body_end;
        }
    }

    slices
}
