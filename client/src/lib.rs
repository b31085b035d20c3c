//! Client orchestration over a JSON-speaking engine.
//!
//! The engine accepts requests from any thread and emits replies and events
//! on a single shared poll point. This crate turns that stream into:
//!
//! - correlated request/response calls ([`Client::send`]), each caller
//!   waiting only for the reply carrying its own correlation id;
//! - fan-out of every unsolicited event to any number of independent
//!   [`Listener`]s;
//! - one [`Router`] per engine, the only reader of its output, routing by
//!   connection identity.

mod client;
mod collector;
mod config;
mod connection;
mod engine;
mod error;
mod ids;
mod listener;
mod pager;
mod pending;
mod router;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{Client, ClientOptions, DEFAULT_LISTENER_CAPACITY, DEFAULT_REQUEST_TIMEOUT, execute};
pub use collector::MessageCollector;
pub use config::{AuthorizationSection, ClientSection, Config, ConfigError, DEFAULT_SETTLE_DELAY};
pub use connection::ResultObserver;
pub use engine::{Engine, LogCallback, forward_engine_logs};
pub use error::ClientError;
pub use ids::{IdGenerator, SequentialIds, UuidV4Ids};
pub use listener::{Listener, ListenerHandle};
pub use pager::{
    CHATS_PAGE_SIZE, HISTORY_PAGE_SIZE, MEMBERS_PAGE_SIZE, chat_history, chats, supergroup_members,
};
pub use router::{DEFAULT_POLL_TIMEOUT, Router, RouterConfig};
