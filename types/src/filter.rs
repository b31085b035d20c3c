//! Predicates over incoming messages.

use crate::message::{Message, MessageContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageFilter {
    /// Not sent by the account itself.
    NotMe,
    /// Sent by the account itself.
    Me,
    /// Incoming; messages in the account's own chat count as incoming.
    Incoming,
    Outgoing,
    Text,
    Reply,
    Forwarded,
    /// Media carrying a non-empty caption.
    Caption,
    Edited,
    Audio,
    Document,
    Photo,
    Sticker,
    Animation,
    Game,
    Video,
    Voice,
    VideoNote,
    Contact,
    Location,
    Venue,
    Poll,
    Channel,
    Media,
}

impl MessageFilter {
    /// `me` is the account's own user id.
    #[must_use]
    pub fn matches(self, message: &Message, me: i64) -> bool {
        let content = &message.content;
        match self {
            Self::NotMe => message.sender_user_id() != Some(me),
            Self::Me => message.sender_user_id() == Some(me),
            Self::Incoming => !message.is_outgoing,
            Self::Outgoing => message.is_outgoing,
            Self::Text => matches!(content, MessageContent::Text { .. }),
            Self::Reply => message.is_reply(),
            Self::Forwarded => message.forward_info.is_some(),
            Self::Caption => !content.caption().is_empty(),
            Self::Edited => message.edit_date != 0,
            Self::Audio => matches!(content, MessageContent::Audio { .. }),
            Self::Document => matches!(content, MessageContent::Document { .. }),
            Self::Photo => matches!(content, MessageContent::Photo { .. }),
            Self::Sticker => matches!(content, MessageContent::Sticker),
            Self::Animation => matches!(content, MessageContent::Animation { .. }),
            Self::Game => matches!(content, MessageContent::Game),
            Self::Video => matches!(content, MessageContent::Video { .. }),
            Self::Voice => matches!(content, MessageContent::VoiceNote { .. }),
            Self::VideoNote => matches!(content, MessageContent::VideoNote),
            Self::Contact => matches!(content, MessageContent::Contact),
            Self::Location => matches!(content, MessageContent::Location),
            Self::Venue => matches!(content, MessageContent::Venue),
            Self::Poll => matches!(content, MessageContent::Poll),
            Self::Channel => message.is_channel_post,
            Self::Media => content.is_media(),
        }
    }
}

/// True when `message` passes every filter. An empty list passes everything.
#[must_use]
pub fn matches_all(filters: &[MessageFilter], message: &Message, me: i64) -> bool {
    filters.iter().all(|filter| filter.matches(message, me))
}

/// Split a command invocation into its words.
///
/// Returns `None` unless the message is text whose first word is exactly
/// `prefix` followed by `command`.
#[must_use]
pub fn parse_command(message: &Message, command: &str, prefix: &str) -> Option<Vec<String>> {
    let text = message.text()?.trim();
    let expected = format!("{prefix}{command}");
    let expected = expected.trim();
    let args: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    (args.first().map(String::as_str) == Some(expected)).then_some(args)
}
