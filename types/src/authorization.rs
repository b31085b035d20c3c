//! Authorization states reported by the engine.
//!
//! The engine alone drives transitions; the client can only supply the data a
//! given state asks for. States this crate does not model decode to
//! [`AuthorizationState::Unknown`] instead of failing.

use serde::{Deserialize, Serialize};

/// Wire discriminant of the authorization-state event.
pub const UPDATE_AUTHORIZATION_STATE: &str = "updateAuthorizationState";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum AuthorizationState {
    #[serde(rename = "authorizationStateWaitTdlibParameters")]
    WaitParameters,
    #[serde(rename = "authorizationStateWaitPhoneNumber")]
    WaitPhoneNumber,
    #[serde(rename = "authorizationStateWaitEmailAddress")]
    WaitEmailAddress {
        #[serde(default)]
        allow_apple_id: bool,
        #[serde(default)]
        allow_google_id: bool,
    },
    #[serde(rename = "authorizationStateWaitEmailCode")]
    WaitEmailCode {
        #[serde(default)]
        allow_apple_id: bool,
        #[serde(default)]
        allow_google_id: bool,
    },
    #[serde(rename = "authorizationStateWaitCode")]
    WaitCode {
        #[serde(default)]
        code_info: CodeInfo,
    },
    #[serde(rename = "authorizationStateWaitOtherDeviceConfirmation")]
    WaitOtherDeviceConfirmation { link: String },
    #[serde(rename = "authorizationStateWaitRegistration")]
    WaitRegistration {
        #[serde(default)]
        terms_of_service: Option<serde_json::Value>,
    },
    #[serde(rename = "authorizationStateWaitPassword")]
    WaitPassword {
        #[serde(default)]
        password_hint: String,
        #[serde(default)]
        has_recovery_email_address: bool,
    },
    #[serde(rename = "authorizationStateReady")]
    Ready,
    #[serde(rename = "authorizationStateLoggingOut")]
    LoggingOut,
    #[serde(rename = "authorizationStateClosing")]
    Closing,
    #[serde(rename = "authorizationStateClosed")]
    Closed,
    #[serde(other)]
    Unknown,
}

/// Where the one-time code was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInfo {
    #[serde(default)]
    pub phone_number: String,
    /// Seconds before the code may be re-sent.
    #[serde(default)]
    pub timeout: i32,
}

impl AuthorizationState {
    /// Wire name of the state, for logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::WaitParameters => "authorizationStateWaitTdlibParameters",
            Self::WaitPhoneNumber => "authorizationStateWaitPhoneNumber",
            Self::WaitEmailAddress { .. } => "authorizationStateWaitEmailAddress",
            Self::WaitEmailCode { .. } => "authorizationStateWaitEmailCode",
            Self::WaitCode { .. } => "authorizationStateWaitCode",
            Self::WaitOtherDeviceConfirmation { .. } => {
                "authorizationStateWaitOtherDeviceConfirmation"
            }
            Self::WaitRegistration { .. } => "authorizationStateWaitRegistration",
            Self::WaitPassword { .. } => "authorizationStateWaitPassword",
            Self::Ready => "authorizationStateReady",
            Self::LoggingOut => "authorizationStateLoggingOut",
            Self::Closing => "authorizationStateClosing",
            Self::Closed => "authorizationStateClosed",
            Self::Unknown => "unknown",
        }
    }

    /// `Ready` and `Closed` end a handshake.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_unit_state_with_routing_fields() {
        let state: AuthorizationState = serde_json::from_str(
            r#"{"@type":"authorizationStateReady","@extra":"x","@client_id":1}"#,
        )
        .unwrap();
        assert_eq!(state, AuthorizationState::Ready);
        assert!(state.is_terminal());
    }

    #[test]
    fn decodes_confirmation_link() {
        let state: AuthorizationState = serde_json::from_str(
            r#"{"@type":"authorizationStateWaitOtherDeviceConfirmation","link":"tg://login?token=abc"}"#,
        )
        .unwrap();
        assert_eq!(
            state,
            AuthorizationState::WaitOtherDeviceConfirmation {
                link: "tg://login?token=abc".into()
            }
        );
    }

    #[test]
    fn decodes_code_info_ignoring_unmodelled_fields() {
        let state: AuthorizationState = serde_json::from_str(
            r#"{"@type":"authorizationStateWaitCode","code_info":{"@type":"authenticationCodeInfo","phone_number":"+15551234","type":{"@type":"authenticationCodeTypeSms","length":5},"timeout":60}}"#,
        )
        .unwrap();
        let AuthorizationState::WaitCode { code_info } = state else {
            panic!("expected WaitCode, got {state:?}");
        };
        assert_eq!(code_info.phone_number, "+15551234");
        assert_eq!(code_info.timeout, 60);
    }

    #[test]
    fn unmodelled_state_is_unknown() {
        let state: AuthorizationState =
            serde_json::from_str(r#"{"@type":"authorizationStateWaitPremiumPurchase"}"#).unwrap();
        assert_eq!(state, AuthorizationState::Unknown);
        assert!(!state.is_terminal());
    }

    #[test]
    fn name_round_trips_through_serde() {
        let state = AuthorizationState::WaitEmailAddress {
            allow_apple_id: false,
            allow_google_id: true,
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["@type"], state.name());
    }
}
