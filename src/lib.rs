//! # ua-wire
//!
//! Wire layer for an OPC UA style binary protocol.
//!
//! ## Layers
//!
//! - **Framing** ([`protocol`]): turns an arbitrarily fragmented byte
//!   stream into validated chunks, reassembles multi-chunk messages and
//!   splits outgoing ones
//! - **Codec** ([`codec`], [`registry`]): extension objects resolved
//!   through a [`TypeRegistry`], encoding-mask optional fields
//! - **Paging** ([`continuation`]): per-session continuation points for
//!   results larger than a page
//!
//! [`connection`] glues framing to `tokio` readers and writers.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bytes::BytesMut;
//! use ua_wire::codec::{BinaryReader, ExtensionObject, ExtensionObjectCodec};
//! use ua_wire::registry::{Range, TypeRegistry};
//!
//! let codec = ExtensionObjectCodec::new(Arc::new(TypeRegistry::with_standard_types()));
//!
//! let mut buf = BytesMut::new();
//! codec
//!     .encode(&ExtensionObject::new(Range { low: 0.0, high: 10.0 }), &mut buf)
//!     .unwrap();
//!
//! let decoded = codec.decode(&mut BinaryReader::new(buf.freeze())).unwrap();
//! assert_eq!(decoded.downcast_ref::<Range>().unwrap().high, 10.0);
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod continuation;
pub mod error;
pub mod protocol;
pub mod registry;

pub use codec::{ExtensionObject, ExtensionObjectCodec, NodeId, OptionalFieldSet};
pub use config::WireConfig;
pub use continuation::{ContinuationPointStore, ContinuationToken, SessionContinuationPoints};
pub use error::{CodecError, ContinuationError, FramingError, Result, UaWireError};
pub use protocol::{ChunkAssembler, MessageAssembler};
pub use registry::TypeRegistry;
