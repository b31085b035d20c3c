//! Drives the authorization handshake to a terminal state.

use std::ops::ControlFlow;
use std::time::Duration;

use tdlink_client::{AuthorizationSection, Client, DEFAULT_SETTLE_DELAY};
use tdlink_types::AuthorizationState;

use crate::error::AuthError;
use crate::handler::{AuthorizationHandler, CloseOnExit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizeOptions {
    /// Pause after `Ready` before reporting success. The engine keeps flushing
    /// its local state for a moment after announcing readiness.
    pub settle_delay: Duration,
}

impl Default for AuthorizeOptions {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl AuthorizeOptions {
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

impl From<&AuthorizationSection> for AuthorizeOptions {
    fn from(section: &AuthorizationSection) -> Self {
        Self {
            settle_delay: section.settle_delay(),
        }
    }
}

/// Feed every authorization state the engine reports to `handler` until the
/// connection is ready or closed.
///
/// The current state comes from a `getAuthorizationState` query, later states
/// from the event stream. The first handler error closes the connection; the
/// machine then keeps draining states until `Closed` and returns that first
/// error. `handler` is closed exactly once on every exit path.
pub async fn authorize<H>(
    client: &Client,
    handler: &mut H,
    options: &AuthorizeOptions,
) -> Result<(), AuthError>
where
    H: AuthorizationHandler + ?Sized,
{
    // Subscribed before querying so no transition after the query is missed.
    let mut events = client.subscribe();
    let mut handshake = Handshake {
        client,
        handler: CloseOnExit::new(handler),
        options,
        first_error: None,
    };

    let current = client.get_authorization_state().await?;
    if let ControlFlow::Break(outcome) = handshake.step(&current).await {
        return outcome;
    }

    // The engine may also announce the queried state as an event.
    let mut already_handled = Some(current);
    while let Some(event) = events.next().await {
        let Some(state) = event.authorization_state() else {
            continue;
        };
        if already_handled.take().as_ref() == Some(state) {
            tracing::trace!(state = state.name(), "state already handled");
            continue;
        }
        if let ControlFlow::Break(outcome) = handshake.step(state).await {
            return outcome;
        }
    }

    Err(handshake.first_error.unwrap_or(AuthError::StreamEnded))
}

struct Handshake<'a, 'h, H: AuthorizationHandler + ?Sized> {
    client: &'a Client,
    handler: CloseOnExit<'h, H>,
    options: &'a AuthorizeOptions,
    first_error: Option<AuthError>,
}

impl<H: AuthorizationHandler + ?Sized> Handshake<'_, '_, H> {
    async fn step(&mut self, state: &AuthorizationState) -> ControlFlow<Result<(), AuthError>> {
        let client = self.client;
        tracing::debug!(
            connection = %client.connection_id(),
            state = state.name(),
            "authorization state"
        );

        match state {
            AuthorizationState::Ready if self.first_error.is_none() => {
                tokio::time::sleep(self.options.settle_delay).await;
                tracing::info!(connection = %client.connection_id(), "authorized");
                return ControlFlow::Break(Ok(()));
            }
            AuthorizationState::Closed => {
                return ControlFlow::Break(Err(self
                    .first_error
                    .take()
                    .unwrap_or(AuthError::Closed)));
            }
            AuthorizationState::Ready => {}
            _ => {
                let Err(err) = self.handler.handler().handle(client, state).await else {
                    return ControlFlow::Continue(());
                };
                if self.first_error.is_some() {
                    tracing::debug!(state = state.name(), error = %err, "handler failed while closing");
                    return ControlFlow::Continue(());
                }
                tracing::warn!(
                    connection = %client.connection_id(),
                    state = state.name(),
                    error = %err,
                    "authorization failed; closing connection"
                );
                if let Err(close_err) = client.close().await {
                    tracing::debug!(error = %close_err, "close request failed");
                }
                self.first_error = Some(err);
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_config() {
        let section = AuthorizationSection { settle_delay_ms: 25 };
        assert_eq!(
            AuthorizeOptions::from(&section).settle_delay,
            Duration::from_millis(25)
        );
        assert_eq!(AuthorizeOptions::default().settle_delay, DEFAULT_SETTLE_DELAY);
        assert_eq!(
            AuthorizeOptions::default()
                .settle_delay(Duration::ZERO)
                .settle_delay,
            Duration::ZERO
        );
    }
}
