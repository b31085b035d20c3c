//! Typed requests the client layer issues itself.
//!
//! The full request catalogue is generated elsewhere; this module carries only
//! the handful the correlator, the authorization handshake and the helpers
//! need. Anything else goes through `Client::send_json`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::authorization::AuthorizationState;
use crate::chat::{Chat, ChatMembers, Chats};
use crate::message::{Message, Messages, User};

/// A request with a known wire discriminant and reply shape.
pub trait Function: Serialize {
    /// Value of the request's `@type`.
    const TYPE: &'static str;
    type Response: DeserializeOwned;
}

/// Reply of type `ok`: the request succeeded and returned nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "[REDACTED]" }
}

/// Engine start-up parameters, requested by the "needs parameters" state.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTdlibParameters {
    pub use_test_dc: bool,
    pub database_directory: String,
    pub files_directory: String,
    pub database_encryption_key: String,
    pub use_file_database: bool,
    pub use_chat_info_database: bool,
    pub use_message_database: bool,
    pub use_secret_chats: bool,
    pub api_id: i32,
    pub api_hash: String,
    pub system_language_code: String,
    pub device_model: String,
    pub system_version: String,
    pub application_version: String,
}

// Manual Debug impl to keep credentials out of logs.
impl fmt::Debug for SetTdlibParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetTdlibParameters")
            .field("use_test_dc", &self.use_test_dc)
            .field("database_directory", &self.database_directory)
            .field("files_directory", &self.files_directory)
            .field(
                "database_encryption_key",
                &redact(&self.database_encryption_key),
            )
            .field("api_id", &self.api_id)
            .field("api_hash", &redact(&self.api_hash))
            .field("system_language_code", &self.system_language_code)
            .field("device_model", &self.device_model)
            .field("application_version", &self.application_version)
            .finish_non_exhaustive()
    }
}

impl Function for SetTdlibParameters {
    const TYPE: &'static str = "setTdlibParameters";
    type Response = Ack;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumberAuthenticationSettings {
    pub allow_flash_call: bool,
    pub is_current_phone_number: bool,
    pub allow_sms_retriever_api: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAuthenticationPhoneNumber {
    pub phone_number: String,
    pub settings: PhoneNumberAuthenticationSettings,
}

impl Function for SetAuthenticationPhoneNumber {
    const TYPE: &'static str = "setAuthenticationPhoneNumber";
    type Response = Ack;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAuthenticationCode {
    pub code: String,
}

impl Function for CheckAuthenticationCode {
    const TYPE: &'static str = "checkAuthenticationCode";
    type Response = Ack;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAuthenticationPassword {
    pub password: String,
}

impl fmt::Debug for CheckAuthenticationPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckAuthenticationPassword")
            .field("password", &redact(&self.password))
            .finish()
    }
}

impl Function for CheckAuthenticationPassword {
    const TYPE: &'static str = "checkAuthenticationPassword";
    type Response = Ack;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAuthenticationBotToken {
    pub token: String,
}

impl fmt::Debug for CheckAuthenticationBotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckAuthenticationBotToken")
            .field("token", &redact(&self.token))
            .finish()
    }
}

impl Function for CheckAuthenticationBotToken {
    const TYPE: &'static str = "checkAuthenticationBotToken";
    type Response = Ack;
}

/// Ask for a confirmation link to be shown on another, already logged-in device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestQrCodeAuthentication {
    pub other_user_ids: Vec<i64>,
}

impl Function for RequestQrCodeAuthentication {
    const TYPE: &'static str = "requestQrCodeAuthentication";
    type Response = Ack;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub first_name: String,
    pub last_name: String,
}

impl Function for RegisterUser {
    const TYPE: &'static str = "registerUser";
    type Response = Ack;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAuthorizationState {}

impl Function for GetAuthorizationState {
    const TYPE: &'static str = "getAuthorizationState";
    type Response = AuthorizationState;
}

/// Close the connection; the engine answers, then walks to the closed state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Close {}

impl Function for Close {
    const TYPE: &'static str = "close";
    type Response = Ack;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOut {}

impl Function for LogOut {
    const TYPE: &'static str = "logOut";
    type Response = Ack;
}

/// Close the connection and delete all of its local data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destroy {}

impl Function for Destroy {
    const TYPE: &'static str = "destroy";
    type Response = Ack;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMe {}

impl Function for GetMe {
    const TYPE: &'static str = "getMe";
    type Response = User;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMessage {
    pub chat_id: i64,
    pub message_id: i64,
}

impl Function for GetMessage {
    const TYPE: &'static str = "getMessage";
    type Response = Message;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChatHistory {
    pub chat_id: i64,
    pub from_message_id: i64,
    pub offset: i32,
    pub limit: i32,
    pub only_local: bool,
}

impl Function for GetChatHistory {
    const TYPE: &'static str = "getChatHistory";
    type Response = Messages;
}

/// Allowed synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLogVerbosityLevel {
    pub new_verbosity_level: i32,
}

impl Function for SetLogVerbosityLevel {
    const TYPE: &'static str = "setLogVerbosityLevel";
    type Response = Ack;
}

/// Allowed synchronously for a few option names (e.g. `version`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOption {
    pub name: String,
}

impl Function for GetOption {
    const TYPE: &'static str = "getOption";
    type Response = OptionValue;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum OptionValue {
    #[serde(rename = "optionValueBoolean")]
    Boolean { value: bool },
    #[serde(rename = "optionValueEmpty")]
    Empty,
    #[serde(rename = "optionValueInteger")]
    Integer {
        #[serde(with = "crate::json_int64")]
        value: i64,
    },
    #[serde(rename = "optionValueString")]
    String { value: String },
}

/// One page of the main chat list, ordered below `offset_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChats {
    #[serde(with = "crate::json_int64")]
    pub offset_order: i64,
    pub offset_chat_id: i64,
    pub limit: i32,
}

impl Function for GetChats {
    const TYPE: &'static str = "getChats";
    type Response = Chats;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChat {
    pub chat_id: i64,
}

impl Function for GetChat {
    const TYPE: &'static str = "getChat";
    type Response = Chat;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetSupergroupMembers {
    pub supergroup_id: i64,
    /// `None` lists recent members.
    pub filter: Option<serde_json::Value>,
    pub offset: i32,
    pub limit: i32,
}

impl Function for GetSupergroupMembers {
    const TYPE: &'static str = "getSupergroupMembers";
    type Response = ChatMembers;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum ProxyType {
    #[serde(rename = "proxyTypeSocks5")]
    Socks5 { username: String, password: String },
    #[serde(rename = "proxyTypeHttp")]
    Http {
        username: String,
        password: String,
        /// Only plain HTTP requests go through the proxy.
        http_only: bool,
    },
    #[serde(rename = "proxyTypeMtproto")]
    Mtproto { secret: String },
}

// Manual Debug impl to keep proxy credentials out of logs.
impl fmt::Debug for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socks5 { username, password } => f
                .debug_struct("Socks5")
                .field("username", username)
                .field("password", &redact(password))
                .finish(),
            Self::Http {
                username,
                password,
                http_only,
            } => f
                .debug_struct("Http")
                .field("username", username)
                .field("password", &redact(password))
                .field("http_only", http_only)
                .finish(),
            Self::Mtproto { secret } => f
                .debug_struct("Mtproto")
                .field("secret", &redact(secret))
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddProxy {
    pub server: String,
    pub port: i32,
    pub enable: bool,
    #[serde(rename = "type")]
    pub proxy_type: ProxyType,
}

impl Function for AddProxy {
    const TYPE: &'static str = "addProxy";
    type Response = Proxy;
}

/// Reply to `addProxy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub id: i32,
    pub server: String,
    pub port: i32,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(rename = "type")]
    pub proxy_type: ProxyType,
}
