//! Pluggable value codecs.
//!
//! The sync route uses a [`Codec`] to encode the initial snapshot sent as
//! the first binary frame. Decoding is left to the engine; the connection
//! adapter never calls a codec.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SyncError;

/// Encodes values of type `V` to bytes and back.
pub trait Codec<V>: Send + Sync {
    /// Encodes `value`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Codec`] if the value cannot be represented.
    fn encode(&self, value: &V) -> Result<Vec<u8>, SyncError>;

    /// Decodes a value from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Codec`] if `bytes` is not a valid encoding.
    fn decode(&self, bytes: &[u8]) -> Result<V, SyncError>;
}

/// JSON codec backed by `serde_json`. The default for sync routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<V> Codec<V> for JsonCodec
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>, SyncError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, SyncError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Document {
        title: String,
        revision: u32,
    }

    #[test]
    fn encodes_as_compact_json() {
        let doc = Document {
            title: "notes".to_string(),
            revision: 3,
        };
        let Ok(bytes) = JsonCodec.encode(&doc) else {
            panic!("encode failed");
        };
        assert_eq!(bytes, br#"{"title":"notes","revision":3}"#.to_vec());
    }

    #[test]
    fn decode_rejects_malformed_input() {
        let result: Result<Document, SyncError> = JsonCodec.decode(b"{\"title\":");
        assert!(matches!(result, Err(SyncError::Codec(_))));
    }

    #[test]
    fn encode_failure_is_a_codec_error() {
        // JSON object keys must be strings.
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1u8);
        let result = JsonCodec.encode(&map);
        assert!(matches!(result, Err(SyncError::Codec(_))));
    }
}
