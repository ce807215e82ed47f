use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProtocolError;

/// Trace identifier: 16 or 32 lowercase hex characters (8 or 16 bytes)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TraceId(String);

impl TraceId {
    /// Parse a lowercase hex trace id, left-padding it with zeros to 16 or 32 characters.
    pub fn from_hex(hex: &str) -> Result<Self, ProtocolError> {
        let width = if hex.len() <= 16 { 16 } else { 32 };
        normalize_hex("traceId", hex, 32, width).map(Self)
    }

    /// Build a trace id from 8 or 16 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != 8 && bytes.len() != 16 {
            return Err(ProtocolError::InvalidIdBytes {
                field: "traceId",
                len: bytes.len(),
            });
        }
        Self::from_hex(&hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of raw bytes this id occupies once decoded (8 or 16).
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }
}

/// Span identifier: 16 lowercase hex characters (8 bytes)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpanId(String);

impl SpanId {
    /// Parse a lowercase hex span id, left-padding it with zeros to 16 characters.
    pub fn from_hex(hex: &str) -> Result<Self, ProtocolError> {
        normalize_hex("spanId", hex, 16, 16).map(Self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != 8 {
            return Err(ProtocolError::InvalidIdBytes {
                field: "spanId",
                len: bytes.len(),
            });
        }
        Self::from_hex(&hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_hex(
    field: &'static str,
    hex: &str,
    max: usize,
    width: usize,
) -> Result<String, ProtocolError> {
    if hex.is_empty() {
        return Err(ProtocolError::EmptyId { field });
    }
    if hex.len() > max {
        return Err(ProtocolError::IdTooLong {
            field,
            max,
            value: hex.to_string(),
        });
    }
    if !hex.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(ProtocolError::NotLowerHex {
            field,
            value: hex.to_string(),
        });
    }
    if hex.bytes().all(|c| c == b'0') {
        return Err(ProtocolError::ZeroId { field });
    }
    Ok(format!("{hex:0>width$}"))
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TraceId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl TryFrom<String> for SpanId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<TraceId> for String {
    fn from(id: TraceId) -> Self {
        id.0
    }
}

impl From<SpanId> for String {
    fn from(id: SpanId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_are_left_padded() {
        assert_eq!(TraceId::from_hex("1").unwrap().as_str(), "0000000000000001");
        assert_eq!(SpanId::from_hex("2").unwrap().as_str(), "0000000000000002");
        assert_eq!(
            TraceId::from_hex("11111111111111111").unwrap().as_str(),
            "00000000000000011111111111111111"
        );
    }

    #[test]
    fn byte_len_follows_width() {
        assert_eq!(TraceId::from_hex("a").unwrap().byte_len(), 8);
        assert_eq!(
            TraceId::from_hex("7180c278b62e8f6a216a2aea45d08fc9")
                .unwrap()
                .byte_len(),
            16
        );
    }

    #[test]
    fn rejects_invalid_hex() {
        assert_eq!(
            TraceId::from_hex(""),
            Err(ProtocolError::EmptyId { field: "traceId" })
        );
        assert!(matches!(
            SpanId::from_hex("ABCDEF"),
            Err(ProtocolError::NotLowerHex { .. })
        ));
        assert!(matches!(
            SpanId::from_hex("0x12"),
            Err(ProtocolError::NotLowerHex { .. })
        ));
        assert!(matches!(
            SpanId::from_hex("11111111111111111"),
            Err(ProtocolError::IdTooLong { max: 16, .. })
        ));
        assert_eq!(
            SpanId::from_hex("0000"),
            Err(ProtocolError::ZeroId { field: "spanId" })
        );
    }

    #[test]
    fn from_bytes_round_trips_through_hex() {
        let id = SpanId::from_bytes(&[0x5b, 0x41, 0x85, 0x66, 0x6d, 0x50, 0xf6, 0x8b]).unwrap();
        assert_eq!(id.as_str(), "5b4185666d50f68b");
        assert!(matches!(
            TraceId::from_bytes(&[1, 2, 3]),
            Err(ProtocolError::InvalidIdBytes { len: 3, .. })
        ));
    }

    #[test]
    fn serde_validates() {
        let id: TraceId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "0000000000000abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0000000000000abc\"");
        assert!(serde_json::from_str::<SpanId>("\"xyz\"").is_err());
    }
}
