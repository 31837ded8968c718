//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding RPC messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    /// Common causes: malformed JSON, missing fields, truncated input.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message passed deserialization but violates a protocol rule —
    /// e.g. a player name outside the allowed character set.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
