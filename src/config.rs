//! Wire-level limits and switches.
//!
//! [`WireConfig`] gathers every limit the framing, codec and continuation
//! layers enforce. It deserializes from JSON; missing keys take their
//! defaults.
//!
//! # Example
//!
//! ```
//! use ua_wire::WireConfig;
//!
//! let config = WireConfig::from_json(r#"{ "max_chunk_size": 8192 }"#).unwrap();
//! assert_eq!(config.max_chunk_size, 8192);
//! assert_eq!(config.max_continuation_points, 10);
//! ```

use serde::{Deserialize, Serialize};

use crate::codec::DecodeOptions;
use crate::error::{Result, UaWireError};
use crate::protocol::{DEFAULT_MAX_CHUNK_SIZE, HEADER_SIZE};

/// Default maximum reassembled message size (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum chunks per message.
pub const DEFAULT_MAX_CHUNK_COUNT: usize = 4096;

/// Default maximum continuation points per session.
pub const DEFAULT_MAX_CONTINUATION_POINTS: usize = 10;

/// Default transport read buffer size (64 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Limits and switches for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Maximum chunk size, header included.
    pub max_chunk_size: u32,
    /// Maximum reassembled message body size. 0 means unlimited.
    pub max_message_size: usize,
    /// Maximum chunks per message. 0 means unlimited.
    pub max_chunk_count: usize,
    /// Maximum incomplete messages per connection. 0 means unlimited.
    pub max_pending_messages: usize,
    /// Maximum live continuation points per session. 0 means unlimited.
    pub max_continuation_points: usize,
    /// Fail extension object decoding on body length drift instead of
    /// warning and resynchronizing.
    pub strict_body_length: bool,
    /// Bytes requested per transport read.
    pub read_buffer_size: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_chunk_count: DEFAULT_MAX_CHUNK_COUNT,
            max_pending_messages: 0,
            max_continuation_points: DEFAULT_MAX_CONTINUATION_POINTS,
            strict_body_length: false,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl WireConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: WireConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the maximum chunk size.
    pub fn with_max_chunk_size(mut self, size: u32) -> Self {
        self.max_chunk_size = size;
        self
    }

    /// Set the maximum message size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the maximum chunk count.
    pub fn with_max_chunk_count(mut self, count: usize) -> Self {
        self.max_chunk_count = count;
        self
    }

    /// Set the maximum incomplete messages per connection.
    pub fn with_max_pending_messages(mut self, count: usize) -> Self {
        self.max_pending_messages = count;
        self
    }

    /// Set the maximum continuation points per session.
    pub fn with_max_continuation_points(mut self, count: usize) -> Self {
        self.max_continuation_points = count;
        self
    }

    /// Enable or disable strict body length checking.
    pub fn with_strict_body_length(mut self, strict: bool) -> Self {
        self.strict_body_length = strict;
        self
    }

    /// Set the transport read buffer size.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Check that the values can work together.
    pub fn validate(&self) -> Result<()> {
        if (self.max_chunk_size as usize) <= HEADER_SIZE {
            return Err(UaWireError::Config(format!(
                "max_chunk_size {} must exceed the {}-byte header",
                self.max_chunk_size, HEADER_SIZE
            )));
        }
        if self.read_buffer_size == 0 {
            return Err(UaWireError::Config(
                "read_buffer_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Extension object decode options.
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            strict_body_length: self.strict_body_length,
        }
    }
}
