//! Serializable trained artifacts

use crate::InferenceError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trained state that can be stored as opaque bytes and restored.
///
/// Implemented for every serde type; the byte format is postcard.
pub trait Artifact: Sized {
    /// Encode into bytes
    fn encode(&self) -> Result<Vec<u8>, InferenceError>;
    /// Restore from bytes produced by [`Artifact::encode`]
    fn decode(bytes: &[u8]) -> Result<Self, InferenceError>;
}

impl<T> Artifact for T
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self) -> Result<Vec<u8>, InferenceError> {
        postcard::to_allocvec(self).map_err(|e| InferenceError::Serialization(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self, InferenceError> {
        postcard::from_bytes(bytes).map_err(|e| InferenceError::Serialization(e.to_string()))
    }
}
