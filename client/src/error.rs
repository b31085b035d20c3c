use std::time::Duration;

use tdlink_types::{CorrelationId, EngineError, EnvelopeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No reply arrived before the deadline. The waiter has been released.
    #[error("{request} timed out after {timeout:?}")]
    Timeout { request: String, timeout: Duration },
    #[error("{request} was canceled")]
    Canceled { request: String },
    /// The engine answered with its error shape.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to decode {kind} reply: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode request: {0}")]
    Encode(#[from] EnvelopeError),
    #[error("malformed reply from engine: {0}")]
    MalformedReply(#[source] EnvelopeError),
    /// The connection shut down before a reply arrived.
    #[error("connection closed")]
    Closed,
    /// The id generator produced an id that is still waiting for its reply.
    /// The earlier request keeps it.
    #[error("correlation id {id} is already pending")]
    DuplicateCorrelationId { id: CorrelationId },
    #[error("engine refused to execute {request} synchronously")]
    ExecuteRejected { request: String },
    #[error("failed to start router thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl ClientError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The engine's structured error, when that is what this is.
    #[must_use]
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_request() {
        let err = ClientError::Timeout {
            request: "getMe".into(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "getMe timed out after 250ms");
        assert!(err.is_timeout());
        assert!(err.engine_error().is_none());
    }

    #[test]
    fn engine_error_is_exposed() {
        let err = ClientError::from(EngineError::new(401, "UNAUTHORIZED"));
        assert_eq!(err.engine_error().map(|e| e.code), Some(401));
        assert_eq!(err.to_string(), "engine error: 401 UNAUTHORIZED");
    }
}
