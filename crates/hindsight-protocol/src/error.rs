/// Errors raised while building span model values from untrusted input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("{field} is empty")]
    EmptyId { field: &'static str },

    #[error("{field}.len() > {max}: {value}")]
    IdTooLong {
        field: &'static str,
        max: usize,
        value: String,
    },

    #[error("{field} should be lower-hex encoded with no prefix: {value}")]
    NotLowerHex { field: &'static str, value: String },

    #[error("{field} is all zeros")]
    ZeroId { field: &'static str },

    #[error("{field} should be 8 or 16 bytes, was {len}")]
    InvalidIdBytes { field: &'static str, len: usize },

    #[error("invalid ip address: {0}")]
    InvalidIp(String),
}
