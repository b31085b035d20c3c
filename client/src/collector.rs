//! Callback-style consumption of message events.
//!
//! Each `on_*` call runs its own listener until [`MessageCollector::close`]
//! (or the connection shutting down) ends it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tdlink_types::{Event, Message, MessageFilter, matches_all, parse_command};

use crate::client::Client;
use crate::error::ClientError;
use crate::listener::{Listener, ListenerHandle};

/// Filters every command handler applies before looking at the text.
const COMMAND_FILTERS: [MessageFilter; 3] = [
    MessageFilter::Incoming,
    MessageFilter::NotMe,
    MessageFilter::Text,
];

#[derive(Default)]
struct Handles {
    handles: Vec<ListenerHandle>,
    closed: bool,
}

pub struct MessageCollector {
    client: Client,
    me: i64,
    handles: Mutex<Handles>,
}

impl MessageCollector {
    /// Resolve the account's own user id, used by the `Me`/`NotMe` filters.
    pub async fn start(client: Client) -> Result<Self, ClientError> {
        let me = client.get_me().await?.id;
        Ok(Self::with_user_id(client, me))
    }

    #[must_use]
    pub fn with_user_id(client: Client, me: i64) -> Self {
        Self {
            client,
            me,
            handles: Mutex::new(Handles::default()),
        }
    }

    #[must_use]
    pub fn me(&self) -> i64 {
        self.me
    }

    fn handles(&self) -> MutexGuard<'_, Handles> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listen(&self) -> Listener {
        let listener = self.client.subscribe();
        let handle = listener.handle();
        let mut handles = self.handles();
        if handles.closed {
            handle.close();
        } else {
            handles.handles.push(handle);
        }
        listener
    }

    /// Call `f` for every new message passing all `filters`.
    pub async fn on_message<F>(&self, filters: &[MessageFilter], mut f: F)
    where
        F: FnMut(&Client, &Message),
    {
        let mut listener = self.listen();
        while let Some(event) = listener.next().await {
            if let Event::NewMessage(message) = event.as_ref()
                && matches_all(filters, message, self.me)
            {
                f(&self.client, message);
            }
        }
    }

    /// Call `f` for every edited message passing all `filters`.
    ///
    /// Edit notices carry no message body, so each one costs a `getMessage`
    /// round trip. Messages that cannot be fetched are skipped.
    pub async fn on_edited_message<F>(&self, filters: &[MessageFilter], mut f: F)
    where
        F: FnMut(&Client, &Message),
    {
        let mut filters = filters.to_vec();
        filters.push(MessageFilter::Edited);
        let mut listener = self.listen();
        while let Some(event) = listener.next().await {
            let Event::MessageEdited {
                chat_id,
                message_id,
                ..
            } = *event
            else {
                continue;
            };
            match self.client.get_message(chat_id, message_id).await {
                Ok(message) if matches_all(&filters, &message, self.me) => {
                    f(&self.client, &message);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(chat_id, message_id, error = %err, "skipping edited message");
                }
            }
        }
    }

    /// Call `f` with the words of every incoming `{prefix}{command}` text
    /// message from someone else.
    pub async fn on_command<F>(&self, command: &str, prefix: &str, mut f: F)
    where
        F: FnMut(&Client, Vec<String>),
    {
        let mut listener = self.listen();
        while let Some(event) = listener.next().await {
            let Event::NewMessage(message) = event.as_ref() else {
                continue;
            };
            if !matches_all(&COMMAND_FILTERS, message, self.me) {
                continue;
            }
            if let Some(args) = parse_command(message, command, prefix) {
                f(&self.client, args);
            }
        }
    }

    /// End every running `on_*` call. Later calls return immediately.
    pub fn close(&self) {
        let handles = {
            let mut guard = self.handles();
            guard.closed = true;
            std::mem::take(&mut guard.handles)
        };
        for handle in handles {
            handle.close();
        }
    }
}
