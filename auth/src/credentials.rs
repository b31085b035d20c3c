//! Out-of-band credential exchange between a handler and whoever answers it.
//!
//! The handler asks for one credential at a time and waits for the answer.
//! Either side may go away at any moment: a dropped prompter or a dropped
//! request turns into [`AuthError::InputClosed`] for the handler, and a
//! closed handler ends the prompter's stream.

use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    PhoneNumber,
    Code,
    Password,
    FirstName,
    LastName,
}

impl CredentialKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PhoneNumber => "phone number",
            Self::Code => "code",
            Self::Password => "password",
            Self::FirstName => "first name",
            Self::LastName => "last name",
        }
    }

    /// Whether answers should stay out of logs and echoes.
    #[must_use]
    pub fn is_secret(self) -> bool {
        matches!(self, Self::Password)
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One pending question from a handler.
pub struct CredentialRequest {
    kind: CredentialKind,
    hint: Option<String>,
    reply: oneshot::Sender<String>,
}

impl fmt::Debug for CredentialRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRequest")
            .field("kind", &self.kind)
            .field("hint", &self.hint)
            .finish_non_exhaustive()
    }
}

impl CredentialRequest {
    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// Extra context from the engine, e.g. where a code was sent or a password hint.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Answer the request. Returns `false` if the handler stopped waiting.
    pub fn respond(self, value: impl Into<String>) -> bool {
        self.reply.send(value.into()).is_ok()
    }
}

/// The answering side: a stream of requests, ending when the handler closes.
#[derive(Debug)]
pub struct CredentialPrompts {
    rx: mpsc::Receiver<CredentialRequest>,
}

impl CredentialPrompts {
    pub async fn next(&mut self) -> Option<CredentialRequest> {
        self.rx.recv().await
    }
}

/// The asking side, owned by a handler.
#[derive(Debug)]
pub(crate) struct CredentialChannel {
    tx: Option<mpsc::Sender<CredentialRequest>>,
}

impl CredentialChannel {
    pub fn new() -> (Self, CredentialPrompts) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx: Some(tx) }, CredentialPrompts { rx })
    }

    pub async fn request(
        &self,
        kind: CredentialKind,
        hint: Option<String>,
    ) -> Result<String, AuthError> {
        let tx = self.tx.as_ref().ok_or(AuthError::InputClosed)?;
        let (reply, answer) = oneshot::channel();
        tx.send(CredentialRequest { kind, hint, reply })
            .await
            .map_err(|_| AuthError::InputClosed)?;
        let value = answer.await.map_err(|_| AuthError::InputClosed)?;
        tracing::debug!(credential = %kind, "credential supplied");
        Ok(value)
    }

    /// Stop asking. The prompter sees the end of its stream once queued requests drain.
    pub fn close(&mut self) {
        self.tx = None;
    }
}
