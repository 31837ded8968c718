//! Codec trait and the default JSON implementation.
//!
//! The lobby never assumes a concrete encoding — everything that touches
//! bytes goes through [`Codec`], so a binary codec can replace JSON
//! without touching session or instance code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts RPC messages to and from bytes.
///
/// `Send + Sync + 'static` because the codec is stored in long-lived
/// server state and used from any runtime thread.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed or truncated input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Human-readable, which pays off when replaying an RPC stream from logs.
/// Behind the `json` feature flag (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::rpc::ClientRpc;

    #[test]
    fn test_json_codec_round_trips_client_rpc() {
        let codec = JsonCodec;
        let msg = ClientRpc::RequestGameServerInfo;
        let bytes = codec.encode(&msg).unwrap();
        let decoded: ClientRpc = codec.decode(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_error() {
        let codec = JsonCodec;
        let result: Result<ClientRpc, _> = codec.decode(b"not json at all");
        assert!(result.is_err());
    }
}
