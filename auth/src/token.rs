//! Login with a long-lived token, no person involved.

use std::fmt;

use tdlink_client::Client;
use tdlink_types::AuthorizationState;
use tdlink_types::functions::{CheckAuthenticationBotToken, SetTdlibParameters};

use crate::error::AuthError;
use crate::handler::{AuthorizationHandler, HandlerFut};

/// Answers the phone-number state with a pre-configured token. The engine
/// accepts either there; anything interactive is unsupported.
pub struct TokenAuthorizer {
    parameters: SetTdlibParameters,
    token: String,
}

// Manual Debug impl to keep the token out of logs.
impl fmt::Debug for TokenAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthorizer")
            .field("parameters", &self.parameters)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TokenAuthorizer {
    #[must_use]
    pub fn new(parameters: SetTdlibParameters, token: impl Into<String>) -> Self {
        Self {
            parameters,
            token: token.into(),
        }
    }
}

impl AuthorizationHandler for TokenAuthorizer {
    fn handle<'a>(
        &'a mut self,
        client: &'a Client,
        state: &'a AuthorizationState,
    ) -> HandlerFut<'a> {
        Box::pin(async move {
            match state {
                AuthorizationState::WaitParameters => {
                    client.send(&self.parameters).await?;
                }
                AuthorizationState::WaitPhoneNumber => {
                    client
                        .send(&CheckAuthenticationBotToken {
                            token: self.token.clone(),
                        })
                        .await?;
                }
                AuthorizationState::Ready
                | AuthorizationState::Closing
                | AuthorizationState::Closed => {}
                AuthorizationState::WaitEmailAddress { .. }
                | AuthorizationState::WaitEmailCode { .. }
                | AuthorizationState::WaitCode { .. }
                | AuthorizationState::WaitOtherDeviceConfirmation { .. }
                | AuthorizationState::WaitRegistration { .. }
                | AuthorizationState::WaitPassword { .. }
                | AuthorizationState::LoggingOut
                | AuthorizationState::Unknown => return Err(AuthError::unsupported(state)),
            }
            Ok(())
        })
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tdlink_client::testing::ScriptedEngine;
    use tdlink_client::{ClientOptions, Router, RouterConfig};

    #[tokio::test]
    async fn interactive_and_unknown_states_are_rejected_without_requests() {
        let engine = Arc::new(ScriptedEngine::new());
        let router = Router::start(engine.clone(), RouterConfig::default()).unwrap();
        let client = router.open(ClientOptions::default()).unwrap();
        let mut handler = TokenAuthorizer::new(SetTdlibParameters::default(), "123:abc");

        for state in [
            AuthorizationState::Unknown,
            AuthorizationState::LoggingOut,
            AuthorizationState::WaitCode {
                code_info: Default::default(),
            },
            AuthorizationState::WaitRegistration {
                terms_of_service: None,
            },
        ] {
            let err = handler.handle(&client, &state).await.unwrap_err();
            assert!(
                matches!(err, AuthError::UnsupportedState { state: name } if name == state.name()),
                "{err}"
            );
        }
        handler
            .handle(&client, &AuthorizationState::Closed)
            .await
            .unwrap();
        assert!(engine.submitted().is_empty());
    }

    #[test]
    fn debug_redacts_token() {
        let handler = TokenAuthorizer::new(SetTdlibParameters::default(), "123456:secret");
        let rendered = format!("{handler:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
