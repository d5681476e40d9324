//! Error types for ua-wire.
//!
//! Errors are grouped by the layer that raises them:
//!
//! - [`FramingError`] - chunk boundaries and message limits. Always aborts
//!   the connection.
//! - [`CodecError`] - binary encoding/decoding. Unknown types and body
//!   length drift are normally recovered inside the codec and only surface
//!   here in strict mode.
//! - [`ContinuationError`] - bad or exhausted continuation points. An
//!   expected, recoverable result.
//!
//! [`UaWireError`] wraps all of them for the async connection layer.

use thiserror::Error;

use crate::codec::{NodeId, StatusCode};

/// Errors raised while reconstructing chunks and messages from the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// Header declares a total length smaller than the header itself.
    #[error("chunk too small: declared {declared} bytes, minimum is {minimum}")]
    ChunkTooSmall {
        /// Length declared by the header.
        declared: usize,
        /// Minimum header size.
        minimum: usize,
    },

    /// Header declares a total length above the negotiated maximum.
    #[error("chunk size {declared} exceeds maximum {maximum}")]
    ChunkSizeExceeded {
        /// Length declared by the header.
        declared: usize,
        /// Configured maximum chunk size.
        maximum: usize,
    },

    /// Header bytes could not be interpreted.
    #[error("malformed chunk header: {0}")]
    MalformedHeader(String),

    /// Reassembled message body grew past the configured maximum.
    #[error("message size {size} exceeds maximum {maximum}")]
    MessageTooLarge {
        /// Size the message would have reached.
        size: usize,
        /// Configured maximum message size.
        maximum: usize,
    },

    /// Message spans more chunks than allowed.
    #[error("message chunk count {count} exceeds maximum {maximum}")]
    TooManyChunks {
        /// Chunk count the message would have reached.
        count: usize,
        /// Configured maximum chunk count.
        maximum: usize,
    },

    /// A new message would exceed the number of incomplete messages allowed.
    #[error("pending message count {count} exceeds maximum {maximum}")]
    TooManyPendingMessages {
        /// Pending count the new message would have reached.
        count: usize,
        /// Configured maximum pending messages.
        maximum: usize,
    },
}

/// Errors raised by the binary codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before a value was complete.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the value being read.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// No descriptor is registered for the type.
    #[error("unknown type {0}")]
    UnknownType(NodeId),

    /// A known type consumed fewer bytes than its envelope declared.
    #[error("schema mismatch for {type_id}: body declared {declared} bytes, decoder consumed {consumed}")]
    SchemaMismatch {
        /// Encoding id read from the envelope.
        type_id: NodeId,
        /// Body length declared by the envelope.
        declared: usize,
        /// Bytes consumed by the field decoder.
        consumed: usize,
    },

    /// Type is registered without a usable binary encoding id. This is a
    /// registration bug, never a network condition.
    #[error("invalid encoding configuration for {type_id}: {reason}")]
    InvalidEncodingConfiguration {
        /// Data type id of the offending structure.
        type_id: NodeId,
        /// What is wrong with the registration.
        reason: String,
    },

    /// Same identifier registered twice with different schemas.
    #[error("type {0} is already registered with a different schema")]
    DuplicateType(NodeId),

    /// Envelope body encoding byte is not 0, 1 or 2.
    #[error("invalid extension object encoding kind {0:#04x}")]
    InvalidEncodingKind(u8),

    /// Encoding mask has bits set for fields that are not declared.
    #[error("invalid encoding mask {mask:#x}: allowed bits {allowed:#x}")]
    InvalidEncodingMask {
        /// Mask read from the stream.
        mask: u32,
        /// Bits that correspond to declared fields.
        allowed: u32,
    },

    /// NodeId encoding byte is not one of the defined forms.
    #[error("invalid node id encoding {0:#04x}")]
    InvalidNodeIdEncoding(u8),

    /// Variant type byte is not supported.
    #[error("unsupported variant type {0:#04x}")]
    UnsupportedVariantType(u8),

    /// String or byte string length prefix is below -1.
    #[error("invalid length prefix {0}")]
    InvalidLength(i32),

    /// String bytes are not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// Value is too large for its length prefix.
    #[error("value of {0} bytes is too large to encode")]
    TooLarge(usize),
}

impl CodecError {
    /// True for errors that indicate a misconfigured process rather than
    /// bad input. These must not be retried or tolerated.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CodecError::InvalidEncodingConfiguration { .. } | CodecError::DuplicateType(_)
        )
    }
}

/// Errors raised by the continuation point store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContinuationError {
    /// Token is unknown, already released, or malformed.
    #[error("continuation point invalid")]
    ContinuationPointInvalid,

    /// Session already holds the maximum number of continuation points.
    #[error("no continuation points available: limit of {limit} reached")]
    NoContinuationPoints {
        /// Configured per-session maximum.
        limit: usize,
    },
}

impl ContinuationError {
    /// Status code reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContinuationError::ContinuationPointInvalid => {
                StatusCode::BAD_CONTINUATION_POINT_INVALID
            }
            ContinuationError::NoContinuationPoints { .. } => {
                StatusCode::BAD_NO_CONTINUATION_POINTS
            }
        }
    }
}

/// Main error type for all ua-wire operations.
#[derive(Debug, Error)]
pub enum UaWireError {
    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Framing error, the connection must be closed.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Continuation point error.
    #[error("continuation error: {0}")]
    Continuation(#[from] ContinuationError),

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Transport closed in the middle of a chunk.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using UaWireError.
pub type Result<T> = std::result::Result<T, UaWireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_status_codes() {
        assert_eq!(
            ContinuationError::ContinuationPointInvalid.status_code(),
            StatusCode::BAD_CONTINUATION_POINT_INVALID
        );
        assert_eq!(
            ContinuationError::NoContinuationPoints { limit: 3 }.status_code(),
            StatusCode::BAD_NO_CONTINUATION_POINTS
        );
    }

    #[test]
    fn test_fatal_codec_errors() {
        let config = CodecError::InvalidEncodingConfiguration {
            type_id: NodeId::numeric(1, 10),
            reason: "no binary encoding id".to_string(),
        };
        assert!(config.is_fatal());
        assert!(!CodecError::UnknownType(NodeId::numeric(1, 10)).is_fatal());
        assert!(!CodecError::InvalidUtf8.is_fatal());
    }

    #[test]
    fn test_wrapping_into_crate_error() {
        let err: UaWireError = FramingError::ChunkSizeExceeded {
            declared: 2000,
            maximum: 1024,
        }
        .into();
        assert!(err.to_string().contains("exceeds maximum 1024"));
    }
}
