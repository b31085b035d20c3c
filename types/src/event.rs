//! Unsolicited messages from the engine.
//!
//! Only the event categories the client layer acts on are typed; everything
//! else is carried as [`Event::Other`] with its discriminant and raw payload.

use serde::Deserialize;

use crate::authorization::{AuthorizationState, UPDATE_AUTHORIZATION_STATE};
use crate::envelope::Envelope;
use crate::message::Message;

pub const UPDATE_NEW_MESSAGE: &str = "updateNewMessage";
pub const UPDATE_MESSAGE_EDITED: &str = "updateMessageEdited";

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AuthorizationState(AuthorizationState),
    NewMessage(Box<Message>),
    MessageEdited {
        chat_id: i64,
        message_id: i64,
        edit_date: i32,
    },
    Other {
        kind: String,
        payload: serde_json::Value,
    },
}

#[derive(Deserialize)]
struct UpdateAuthorizationState {
    authorization_state: AuthorizationState,
}

#[derive(Deserialize)]
struct UpdateNewMessage {
    message: Box<Message>,
}

#[derive(Deserialize)]
struct UpdateMessageEdited {
    chat_id: i64,
    message_id: i64,
    #[serde(default)]
    edit_date: i32,
}

impl Event {
    /// Decode the full payload of an uncorrelated envelope.
    pub fn decode(envelope: &Envelope) -> Result<Self, serde_json::Error> {
        match envelope.kind() {
            UPDATE_AUTHORIZATION_STATE => {
                let update: UpdateAuthorizationState = envelope.decode()?;
                Ok(Self::AuthorizationState(update.authorization_state))
            }
            UPDATE_NEW_MESSAGE => {
                let update: UpdateNewMessage = envelope.decode()?;
                Ok(Self::NewMessage(update.message))
            }
            UPDATE_MESSAGE_EDITED => {
                let update: UpdateMessageEdited = envelope.decode()?;
                Ok(Self::MessageEdited {
                    chat_id: update.chat_id,
                    message_id: update.message_id,
                    edit_date: update.edit_date,
                })
            }
            kind => Ok(Self::Other {
                kind: kind.to_string(),
                payload: envelope.decode()?,
            }),
        }
    }

    #[must_use]
    pub fn authorization_state(&self) -> Option<&AuthorizationState> {
        match self {
            Self::AuthorizationState(state) => Some(state),
            _ => None,
        }
    }

    /// Whether this event reports that the connection has shut down.
    #[must_use]
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::AuthorizationState(AuthorizationState::Closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(value: &serde_json::Value) -> Envelope {
        Envelope::parse(value.to_string()).unwrap()
    }

    #[test]
    fn decodes_authorization_update() {
        let event = Event::decode(&envelope(&serde_json::json!({
            "@type": "updateAuthorizationState",
            "authorization_state": {"@type": "authorizationStateClosed"}
        })))
        .unwrap();
        assert!(event.is_connection_closed());
        assert_eq!(
            event.authorization_state(),
            Some(&AuthorizationState::Closed)
        );
    }

    #[test]
    fn decodes_edit_notice() {
        let event = Event::decode(&envelope(&serde_json::json!({
            "@type": "updateMessageEdited",
            "chat_id": 5,
            "message_id": 9,
            "edit_date": 1_700_000_000,
            "reply_markup": null
        })))
        .unwrap();
        assert_eq!(
            event,
            Event::MessageEdited {
                chat_id: 5,
                message_id: 9,
                edit_date: 1_700_000_000
            }
        );
    }

    #[test]
    fn unmodelled_update_is_other() {
        let event = Event::decode(&envelope(&serde_json::json!({
            "@type": "updateOption",
            "name": "version"
        })))
        .unwrap();
        let Event::Other { kind, payload } = event else {
            panic!("expected Other");
        };
        assert_eq!(kind, "updateOption");
        assert_eq!(payload["name"], "version");
    }

    #[test]
    fn malformed_typed_payload_is_an_error() {
        let result = Event::decode(&envelope(&serde_json::json!({
            "@type": "updateNewMessage",
            "message": {"id": "not a number"}
        })));
        assert!(result.is_err());
    }
}
