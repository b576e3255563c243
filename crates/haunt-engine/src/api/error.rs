use thiserror::Error;

use crate::api::types::EntityId;

/// Errors raised by the engine. All of them are configuration or caller mistakes;
/// runtime geometry edge cases (zero zoom, clamped moves) are never errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no extension hook registered under `{0}`")]
    UnknownExtension(String),
    #[error("malformed duration `{0}`")]
    MalformedDuration(String),
    #[error("malformed timing function `{0}`")]
    MalformedEasing(String),
    #[error("attribute `{name}` is not an integer: `{value}`")]
    MalformedAttribute { name: String, value: String },
    #[error("move speed must be finite and positive, got {0}")]
    InvalidSpeed(f32),
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    #[error("entity {0:?} is not attached to the viewport")]
    Detached(EntityId),
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}
