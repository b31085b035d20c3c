use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire discriminant of an error-shaped reply.
pub const ERROR_TYPE: &str = "error";

/// A request the engine answered with failure.
///
/// Decoded from `{"@type": "error", "code": .., "message": ..}`. This is a
/// domain answer, not a transport failure; callers decide what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code} {message}")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failure to interpret or build an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("envelope has an empty @type")]
    MissingType,
    #[error("request {kind} did not serialize to a JSON object")]
    NotAnObject { kind: &'static str },
}
