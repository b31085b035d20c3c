//! Phone-number login with credentials typed in by a person.

use tdlink_client::Client;
use tdlink_types::AuthorizationState;
use tdlink_types::functions::{
    CheckAuthenticationCode, CheckAuthenticationPassword, PhoneNumberAuthenticationSettings,
    RegisterUser, SetAuthenticationPhoneNumber, SetTdlibParameters,
};

use crate::credentials::{CredentialChannel, CredentialKind, CredentialPrompts};
use crate::error::AuthError;
use crate::handler::{AuthorizationHandler, HandlerFut};

/// Asks for phone number, code, password and registration names through
/// [`CredentialPrompts`]. Email login and remote confirmation are not part of
/// this flow.
#[derive(Debug)]
pub struct InteractiveAuthorizer {
    parameters: SetTdlibParameters,
    credentials: CredentialChannel,
}

impl InteractiveAuthorizer {
    #[must_use]
    pub fn new(parameters: SetTdlibParameters) -> (Self, CredentialPrompts) {
        let (credentials, prompts) = CredentialChannel::new();
        (
            Self {
                parameters,
                credentials,
            },
            prompts,
        )
    }

    async fn handle_state(
        &mut self,
        client: &Client,
        state: &AuthorizationState,
    ) -> Result<(), AuthError> {
        match state {
            AuthorizationState::WaitParameters => {
                client.send(&self.parameters).await?;
            }
            AuthorizationState::WaitPhoneNumber => {
                let phone_number = self
                    .credentials
                    .request(CredentialKind::PhoneNumber, None)
                    .await?;
                client
                    .send(&SetAuthenticationPhoneNumber {
                        phone_number,
                        settings: PhoneNumberAuthenticationSettings::default(),
                    })
                    .await?;
            }
            AuthorizationState::WaitCode { code_info } => {
                let hint = (!code_info.phone_number.is_empty())
                    .then(|| code_info.phone_number.clone());
                let code = self.credentials.request(CredentialKind::Code, hint).await?;
                client.send(&CheckAuthenticationCode { code }).await?;
            }
            AuthorizationState::WaitPassword { password_hint, .. } => {
                let hint = (!password_hint.is_empty()).then(|| password_hint.clone());
                let password = self
                    .credentials
                    .request(CredentialKind::Password, hint)
                    .await?;
                client.send(&CheckAuthenticationPassword { password }).await?;
            }
            AuthorizationState::WaitRegistration { .. } => {
                let first_name = self
                    .credentials
                    .request(CredentialKind::FirstName, None)
                    .await?;
                let last_name = self
                    .credentials
                    .request(CredentialKind::LastName, None)
                    .await?;
                client
                    .send(&RegisterUser {
                        first_name,
                        last_name,
                    })
                    .await?;
            }
            AuthorizationState::Ready
            | AuthorizationState::Closing
            | AuthorizationState::Closed => {}
            AuthorizationState::WaitEmailAddress { .. }
            | AuthorizationState::WaitEmailCode { .. }
            | AuthorizationState::WaitOtherDeviceConfirmation { .. }
            | AuthorizationState::LoggingOut
            | AuthorizationState::Unknown => return Err(AuthError::unsupported(state)),
        }
        Ok(())
    }
}

impl AuthorizationHandler for InteractiveAuthorizer {
    fn handle<'a>(
        &'a mut self,
        client: &'a Client,
        state: &'a AuthorizationState,
    ) -> HandlerFut<'a> {
        Box::pin(self.handle_state(client, state))
    }

    fn close(&mut self) {
        self.credentials.close();
    }
}
