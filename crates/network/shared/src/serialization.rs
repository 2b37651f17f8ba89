//! Serialisierungs- und Deserialisierungshilfen.
//!
//! Der Frame-Codec transportiert Payloads als opake Bytes. Welches Format
//! darin steckt entscheidet ein `MessageSerializer`; der Server des Spiels
//! spricht JSON, deshalb ist `JsonSerializer` der Standard.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Trait für serialisierbare Nachrichten-Payloads.
pub trait MessageSerializer: Send + Sync + 'static {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize;

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, SerializationError>
    where
        T: DeserializeOwned;
}

/// UTF-8 JSON, wie vom Spielserver erwartet.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl MessageSerializer for JsonSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize,
    {
        serde_json::to_vec(value).map_err(SerializationError::Json)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, SerializationError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(bytes).map_err(SerializationError::Json)
    }
}

/// Kompakte Binärdarstellung basierend auf `bincode`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeSerializer;

impl MessageSerializer for BincodeSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize,
    {
        bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(SerializationError::BincodeEncode)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, SerializationError>
    where
        T: DeserializeOwned,
    {
        let (value, _len) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(SerializationError::BincodeDecode)?;
        Ok(value)
    }
}

/// Fehler, die bei (De-)Serialisierung auftreten können.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("json error: {0}")]
    Json(serde_json::Error),
    #[error("bincode encode error: {0}")]
    BincodeEncode(bincode::error::EncodeError),
    #[error("bincode decode error: {0}")]
    BincodeDecode(bincode::error::DecodeError),
}
