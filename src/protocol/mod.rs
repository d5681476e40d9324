//! Protocol module - chunk header, framing and message reassembly.
//!
//! This module implements the transport framing layer:
//! - 8-byte chunk header encoding/decoding
//! - Chunk assembler for arbitrarily fragmented reads
//! - Chunk types for received and outgoing data
//! - Message reassembly and splitting

mod chunk;
mod chunk_assembler;
mod chunk_header;
mod message;

pub use chunk::{build_chunk, split_message, MessageChunk, OutboundChunk};
pub use chunk_assembler::{ChunkAssembler, ChunkEvent, HeaderRead, HeaderReader};
pub use chunk_header::{
    ChunkHeader, ChunkKind, MessageType, UaHeaderReader, DEFAULT_MAX_CHUNK_SIZE, HEADER_SIZE,
};
pub use message::{Assembled, MessageAssembler};
