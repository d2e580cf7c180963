//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding messages.
///
/// A `ProtocolError` always means a serialization problem, never a
/// networking or game-rules one — each Sipforge crate keeps its own error
/// enum so the source of a failure is obvious from its type.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// an unknown message tag, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
