use super::state::MarketState;
use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SerializerError {
    #[error("failed to serialize market state: {0}")]
    Serialize(String),

    #[error("failed to parse market state: {0}")]
    Parse(String),
}

/// Encoding applied to the persisted market-state document.
///
/// The persistence controller is format-agnostic; swapping the serializer swaps the file
/// format.
pub trait MarketStateSerializer: Send + Sync {
    fn serialize(&self, state: &MarketState) -> Result<Vec<u8>, SerializerError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<MarketState, SerializerError>;
}

/// JSON market-state encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl MarketStateSerializer for JsonSerializer {
    fn serialize(&self, state: &MarketState) -> Result<Vec<u8>, SerializerError> {
        serde_json::to_vec_pretty(state).map_err(|error| SerializerError::Serialize(error.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<MarketState, SerializerError> {
        serde_json::from_slice(bytes).map_err(|error| SerializerError::Parse(error.to_string()))
    }
}
