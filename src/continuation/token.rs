//! Opaque continuation point tokens.

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::codec::{write_byte_string, BinaryDecode, BinaryEncode, BinaryReader};
use crate::error::CodecError;

/// Opaque token handed to the client in place of the remaining results.
///
/// Clients only echo it back. Tokens minted by a store are 8 bytes; any
/// other length is rejected on redemption.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(Bytes);

impl ContinuationToken {
    const LEN: usize = 8;

    pub(crate) fn from_id(id: u64) -> Self {
        Self(Bytes::copy_from_slice(&id.to_be_bytes()))
    }

    /// Wrap bytes received from a client.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the token bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Store key, if the token is well formed.
    pub(crate) fn id(&self) -> Option<u64> {
        let raw: [u8; Self::LEN] = self.0.as_ref().try_into().ok()?;
        Some(u64::from_be_bytes(raw))
    }
}

impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContinuationToken(")?;
        for b in self.0.iter() {
            write!(f, "{:02x}", b)?;
        }
        f.write_str(")")
    }
}

impl BinaryEncode for ContinuationToken {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        write_byte_string(buf, Some(&self.0[..]))
    }
}

impl BinaryDecode for ContinuationToken {
    fn decode(reader: &mut BinaryReader) -> Result<Self, CodecError> {
        Ok(Self(reader.read_byte_string()?.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let token = ContinuationToken::from_id(0x0102_0304_0506_0708);
        assert_eq!(token.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(token.id(), Some(0x0102_0304_0506_0708));
    }

    #[test]
    fn test_wrong_length_has_no_id() {
        assert_eq!(ContinuationToken::from_bytes(vec![1, 2, 3]).id(), None);
        assert_eq!(ContinuationToken::from_bytes(Bytes::new()).id(), None);
    }

    #[test]
    fn test_wire_form_is_byte_string() {
        let token = ContinuationToken::from_id(9);
        let mut buf = BytesMut::new();
        token.encode(&mut buf).unwrap();

        assert_eq!(&buf[..4], &8i32.to_le_bytes());
        let decoded = ContinuationToken::decode(&mut BinaryReader::new(buf.freeze())).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_debug_is_hex() {
        assert_eq!(
            format!("{:?}", ContinuationToken::from_id(255)),
            "ContinuationToken(00000000000000ff)"
        );
    }
}
