//! Login by confirming a link on another, already logged-in device.

use std::fmt;

use tdlink_client::Client;
use tdlink_types::AuthorizationState;
use tdlink_types::functions::{
    CheckAuthenticationPassword, RequestQrCodeAuthentication, SetTdlibParameters,
};

use crate::credentials::{CredentialChannel, CredentialKind, CredentialPrompts};
use crate::error::AuthError;
use crate::handler::{AuthorizationHandler, HandlerFut};

pub type LinkCallback = Box<dyn FnMut(&str) + Send>;

/// Requests a confirmation link instead of a phone number and hands each
/// distinct link to a callback, typically to render it as a QR code.
///
/// The engine repeats the confirmation state, sometimes with the same link;
/// the callback only runs when the link changes. A two-step password, if the
/// account has one, is asked for through [`CredentialPrompts`].
pub struct LinkAuthorizer {
    parameters: SetTdlibParameters,
    on_link: LinkCallback,
    last_link: Option<String>,
    credentials: CredentialChannel,
}

impl fmt::Debug for LinkAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkAuthorizer")
            .field("parameters", &self.parameters)
            .field("last_link", &self.last_link)
            .finish_non_exhaustive()
    }
}

impl LinkAuthorizer {
    #[must_use]
    pub fn new(
        parameters: SetTdlibParameters,
        on_link: impl FnMut(&str) + Send + 'static,
    ) -> (Self, CredentialPrompts) {
        let (credentials, prompts) = CredentialChannel::new();
        (
            Self {
                parameters,
                on_link: Box::new(on_link),
                last_link: None,
                credentials,
            },
            prompts,
        )
    }

    fn show_link(&mut self, link: &str) {
        if self.last_link.as_deref() == Some(link) {
            return;
        }
        (self.on_link)(link);
        self.last_link = Some(link.to_string());
    }
}

impl AuthorizationHandler for LinkAuthorizer {
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
                    client.send(&RequestQrCodeAuthentication::default()).await?;
                }
                AuthorizationState::WaitOtherDeviceConfirmation { link } => {
                    self.show_link(link);
                }
                AuthorizationState::WaitPassword { password_hint, .. } => {
                    let hint = (!password_hint.is_empty()).then(|| password_hint.clone());
                    let password = self
                        .credentials
                        .request(CredentialKind::Password, hint)
                        .await?;
                    client.send(&CheckAuthenticationPassword { password }).await?;
                }
                AuthorizationState::Ready
                | AuthorizationState::Closing
                | AuthorizationState::Closed => {}
                AuthorizationState::WaitEmailAddress { .. }
                | AuthorizationState::WaitEmailCode { .. }
                | AuthorizationState::WaitCode { .. }
                | AuthorizationState::WaitRegistration { .. }
                | AuthorizationState::LoggingOut
                | AuthorizationState::Unknown => return Err(AuthError::unsupported(state)),
            }
            Ok(())
        })
    }

    fn close(&mut self) {
        self.credentials.close();
    }
}
