use tdlink_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The handler was asked for a state its login flow does not implement.
    #[error("authorization state {state} is not supported by this handler")]
    UnsupportedState { state: &'static str },
    /// Whoever supplies credentials went away before answering.
    #[error("credential input closed")]
    InputClosed,
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The engine closed the connection without any handler error.
    #[error("connection closed during authorization")]
    Closed,
    /// The event stream ended before a terminal state was seen.
    #[error("authorization events ended before a terminal state")]
    StreamEnded,
}

impl AuthError {
    #[must_use]
    pub fn unsupported(state: &tdlink_types::AuthorizationState) -> Self {
        Self::UnsupportedState { state: state.name() }
    }
}
