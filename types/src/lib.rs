//! Wire-level types shared by the tdlink crates.
//!
//! Pure data: no IO, no async. The engine speaks JSON envelopes tagged with
//! `@type`; this crate knows how to read their routing header, how to stamp
//! outgoing requests, and how to decode the few payload shapes the client
//! layer acts on (authorization states, message events, structured errors).

pub mod authorization;
pub mod chat;
pub mod envelope;
pub mod error;
pub mod event;
pub mod filter;
pub mod functions;
pub mod json_int64;
pub mod message;

mod ids;

pub use authorization::{AuthorizationState, CodeInfo};
pub use chat::{Chat, ChatMember, ChatMembers, Chats};
pub use envelope::{Envelope, EnvelopeHeader, encode_request, encode_value, tag_json};
pub use error::{EngineError, EnvelopeError};
pub use event::Event;
pub use filter::{MessageFilter, matches_all, parse_command};
pub use functions::{Ack, Function, OptionValue};
pub use ids::{ConnectionId, CorrelationId};
pub use message::{FormattedText, Message, MessageContent, MessageSender, Messages, User};
