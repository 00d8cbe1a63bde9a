use thiserror::Error;

/// Wire-boundary failures. Protocol conditions (loss, conflicting leaders,
/// missing candidates) are never errors; only malformed data at an
/// encode/decode boundary surfaces here, and callers drop the message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}
