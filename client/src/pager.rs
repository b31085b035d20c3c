//! Streams over paged listings: a chat's history, the chat list and a
//! supergroup's members.
//!
//! Each listing only knows how to fetch its next page; [`paginate`] turns
//! that into a stream that ends on an empty page and yields (then ends on)
//! the first error.

use std::collections::VecDeque;
use std::future::Future;

use futures_util::Stream;
use futures_util::stream;
use tdlink_types::functions::{GetChat, GetChatHistory, GetChats, GetSupergroupMembers};
use tdlink_types::{Chat, ChatMember, Message};

use crate::client::Client;
use crate::error::ClientError;

pub const HISTORY_PAGE_SIZE: i32 = 100;

pub const CHATS_PAGE_SIZE: i32 = 100;

pub const MEMBERS_PAGE_SIZE: i32 = 200;

trait Pager: Send + 'static {
    type Item: Send + 'static;

    /// The next page. An empty page ends the listing.
    fn next_page(&mut self) -> impl Future<Output = Result<Vec<Self::Item>, ClientError>> + Send;
}

struct Paging<P: Pager> {
    pager: P,
    buffered: VecDeque<P::Item>,
    done: bool,
}

fn paginate<P: Pager>(pager: P) -> impl Stream<Item = Result<P::Item, ClientError>> + Send {
    let paging = Paging {
        pager,
        buffered: VecDeque::new(),
        done: false,
    };
    stream::unfold(paging, |mut paging| async move {
        loop {
            if let Some(item) = paging.buffered.pop_front() {
                return Some((Ok(item), paging));
            }
            if paging.done {
                return None;
            }
            match paging.pager.next_page().await {
                Ok(page) if page.is_empty() => paging.done = true,
                Ok(page) => paging.buffered.extend(page),
                Err(err) => {
                    paging.done = true;
                    return Some((Err(err), paging));
                }
            }
        }
    })
}

struct History {
    client: Client,
    chat_id: i64,
    from_message_id: i64,
}

impl Pager for History {
    type Item = Message;

    async fn next_page(&mut self) -> Result<Vec<Message>, ClientError> {
        let page = self
            .client
            .send(&GetChatHistory {
                chat_id: self.chat_id,
                from_message_id: self.from_message_id,
                offset: 0,
                limit: HISTORY_PAGE_SIZE,
                only_local: false,
            })
            .await?;
        if let Some(oldest) = page.messages.last() {
            self.from_message_id = oldest.id;
        }
        Ok(page.messages)
    }
}

/// Messages of `chat_id`, newest first.
pub fn chat_history(
    client: Client,
    chat_id: i64,
) -> impl Stream<Item = Result<Message, ClientError>> + Send {
    paginate(History {
        client,
        chat_id,
        from_message_id: 0,
    })
}

struct ChatList {
    client: Client,
    offset_order: i64,
    offset_chat_id: i64,
    /// A `getChat` failure after part of a page was fetched; reported next.
    deferred: Option<ClientError>,
}

impl Pager for ChatList {
    type Item = Chat;

    async fn next_page(&mut self) -> Result<Vec<Chat>, ClientError> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        let page = self
            .client
            .send(&GetChats {
                offset_order: self.offset_order,
                offset_chat_id: self.offset_chat_id,
                limit: CHATS_PAGE_SIZE,
            })
            .await?;

        let mut chats = Vec::with_capacity(page.chat_ids.len());
        for chat_id in page.chat_ids {
            match self.client.send(&GetChat { chat_id }).await {
                Ok(chat) => {
                    self.offset_order = chat.order;
                    self.offset_chat_id = chat.id;
                    chats.push(chat);
                }
                Err(err) if chats.is_empty() => return Err(err),
                Err(err) => {
                    self.deferred = Some(err);
                    break;
                }
            }
        }
        Ok(chats)
    }
}

/// The main chat list, top first, each chat fetched in full.
pub fn chats(client: Client) -> impl Stream<Item = Result<Chat, ClientError>> + Send {
    paginate(ChatList {
        client,
        offset_order: i64::MAX,
        offset_chat_id: 0,
        deferred: None,
    })
}

struct Members {
    client: Client,
    supergroup_id: i64,
    offset: i32,
    last_page: bool,
}

impl Pager for Members {
    type Item = ChatMember;

    async fn next_page(&mut self) -> Result<Vec<ChatMember>, ClientError> {
        if self.last_page {
            return Ok(Vec::new());
        }
        let page = self
            .client
            .send(&GetSupergroupMembers {
                supergroup_id: self.supergroup_id,
                filter: None,
                offset: self.offset,
                limit: MEMBERS_PAGE_SIZE,
            })
            .await?;
        // The engine reports no total for listings it cannot count.
        self.last_page = page.total_count == 0;
        self.offset += page.members.len() as i32;
        Ok(page.members)
    }
}

/// Recent members of a supergroup, paged by offset.
pub fn supergroup_members(
    client: Client,
    supergroup_id: i64,
) -> impl Stream<Item = Result<ChatMember, ClientError>> + Send {
    paginate(Members {
        client,
        supergroup_id,
        offset: 0,
        last_page: false,
    })
}
