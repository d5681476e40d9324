//! Paged Browse - example of a large result crossing the wire in pages.
//!
//! This example demonstrates:
//! - Encoding a batch of extension objects with `ExtensionObjectCodec`
//! - Splitting the message into chunks and writing them with `write_chunks`
//! - Reading chunks back with `ChunkReader` and reassembling the message
//! - Handing the decoded results out page by page through continuation points
//!
//! # Running
//!
//! ```sh
//! cargo run --example paged_browse
//! ```

use std::sync::Arc;

use bytes::BytesMut;
use ua_wire::codec::{BinaryReader, ExtensionObject, ExtensionObjectCodec};
use ua_wire::connection::{write_chunks, ChunkReader};
use ua_wire::continuation::SessionContinuationPoints;
use ua_wire::protocol::{split_message, Assembled, MessageAssembler, MessageType};
use ua_wire::registry::{Range, TypeRegistry};
use ua_wire::WireConfig;

const REQUEST_ID: u32 = 1;
const PAGE_SIZE: usize = 4;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = WireConfig::default().with_max_chunk_size(128);
    let codec = ExtensionObjectCodec::new(Arc::new(TypeRegistry::with_standard_types()));

    // Server side: encode ten ranges into one message body
    let results: Vec<ExtensionObject> = (0..10u32)
        .map(|i| {
            ExtensionObject::new(Range {
                low: f64::from(i) * 10.0,
                high: f64::from(i) * 10.0 + 9.0,
            })
        })
        .collect();
    let mut body = BytesMut::new();
    codec.encode_array(&results, &mut body)?;

    let chunks = split_message(MessageType::Message, body.freeze(), config.max_chunk_size as usize)?;
    println!("sending {} chunks", chunks.len());

    let (mut client, server) = tokio::io::duplex(64);
    let writer = tokio::spawn(async move { write_chunks(&mut client, &chunks).await });

    // Receiving side: reassemble and decode
    let mut reader = ChunkReader::new(server, &config);
    let mut messages = MessageAssembler::from_config(&config);
    let mut message = None;
    while let Some(chunk) = reader.next_chunk().await? {
        let assembled = messages.push(REQUEST_ID, chunk.chunk_kind(), chunk.body_bytes())?;
        if let Assembled::Complete(bytes) = assembled {
            message = Some(bytes);
        }
    }
    writer.await??;

    let message = message.ok_or("connection closed before the message completed")?;
    let decoded = codec.decode_array(&mut BinaryReader::new(message))?;

    // Hand results out in pages
    let session = SessionContinuationPoints::from_config(&config);
    let mut page = session.register(PAGE_SIZE, decoded).await?;
    let mut number = 1;
    loop {
        let ranges: Vec<String> = page
            .items
            .iter()
            .filter_map(|item| item.downcast_ref::<Range>())
            .map(|r| format!("[{}, {}]", r.low, r.high))
            .collect();
        println!("page {}: {}", number, ranges.join(" "));

        match page.token.take() {
            Some(token) => page = session.get_next(&token, 0, false).await?,
            None => break,
        }
        number += 1;
    }

    Ok(())
}
