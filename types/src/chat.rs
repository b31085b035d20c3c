//! Chats and supergroup members, as far as the pagers need them.

use serde::{Deserialize, Serialize};

use crate::message::MessageSender;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    /// Position in the main chat list; the next `getChats` page starts below it.
    #[serde(default, with = "crate::json_int64")]
    pub order: i64,
}

/// Reply to `getChats`: identifiers only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chats {
    #[serde(default)]
    pub total_count: i32,
    #[serde(default)]
    pub chat_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMember {
    pub member_id: MessageSender,
    #[serde(default)]
    pub inviter_user_id: i64,
    #[serde(default)]
    pub joined_chat_date: i32,
    /// Role and rights; passed through untouched.
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

/// Reply to `getSupergroupMembers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMembers {
    #[serde(default)]
    pub total_count: i32,
    #[serde(default)]
    pub members: Vec<ChatMember>,
}
