//! The slice of the engine's message model that filters and collectors read.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    #[serde(default)]
    pub sender_id: Option<MessageSender>,
    #[serde(default)]
    pub is_outgoing: bool,
    #[serde(default)]
    pub is_channel_post: bool,
    /// Unix time of the last edit; 0 when never edited.
    #[serde(default)]
    pub edit_date: i32,
    #[serde(default)]
    pub reply_to_message_id: i64,
    #[serde(default)]
    pub reply_to: Option<serde_json::Value>,
    #[serde(default)]
    pub forward_info: Option<serde_json::Value>,
    pub content: MessageContent,
}

impl Message {
    #[must_use]
    pub fn sender_user_id(&self) -> Option<i64> {
        match self.sender_id {
            Some(MessageSender::User { user_id }) => Some(user_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.reply_to_message_id != 0 || self.reply_to.is_some()
    }

    /// Plain text of a text message.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(&text.text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum MessageSender {
    #[serde(rename = "messageSenderUser")]
    User { user_id: i64 },
    #[serde(rename = "messageSenderChat")]
    Chat { chat_id: i64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedText {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum MessageContent {
    #[serde(rename = "messageText")]
    Text { text: FormattedText },
    #[serde(rename = "messageAudio")]
    Audio {
        #[serde(default)]
        caption: FormattedText,
    },
    #[serde(rename = "messageVideo")]
    Video {
        #[serde(default)]
        caption: FormattedText,
    },
    #[serde(rename = "messageAnimation")]
    Animation {
        #[serde(default)]
        caption: FormattedText,
    },
    #[serde(rename = "messageDocument")]
    Document {
        #[serde(default)]
        caption: FormattedText,
    },
    #[serde(rename = "messagePhoto")]
    Photo {
        #[serde(default)]
        caption: FormattedText,
    },
    #[serde(rename = "messageVoiceNote")]
    VoiceNote {
        #[serde(default)]
        caption: FormattedText,
    },
    #[serde(rename = "messageSticker")]
    Sticker,
    #[serde(rename = "messageGame")]
    Game,
    #[serde(rename = "messageVideoNote")]
    VideoNote,
    #[serde(rename = "messageContact")]
    Contact,
    #[serde(rename = "messageLocation")]
    Location,
    #[serde(rename = "messageVenue")]
    Venue,
    #[serde(rename = "messagePoll")]
    Poll,
    #[serde(other)]
    Unsupported,
}

impl MessageContent {
    /// Caption of a media message, empty for everything else.
    #[must_use]
    pub fn caption(&self) -> &str {
        match self {
            Self::Audio { caption }
            | Self::Video { caption }
            | Self::Animation { caption }
            | Self::Document { caption }
            | Self::Photo { caption }
            | Self::VoiceNote { caption } => &caption.text,
            _ => "",
        }
    }

    #[must_use]
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            Self::Audio { .. }
                | Self::Video { .. }
                | Self::Animation { .. }
                | Self::Document { .. }
                | Self::Photo { .. }
                | Self::VoiceNote { .. }
        )
    }
}

/// Reply to `getChatHistory`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default)]
    pub total_count: i32,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub usernames: Option<Usernames>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usernames {
    #[serde(default)]
    pub active_usernames: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_text_message() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "@type": "message",
            "id": 10,
            "chat_id": -100,
            "sender_id": {"@type": "messageSenderUser", "user_id": 7},
            "is_outgoing": false,
            "content": {
                "@type": "messageText",
                "text": {"@type": "formattedText", "text": "/start now", "entities": []}
            }
        }))
        .unwrap();
        assert_eq!(message.sender_user_id(), Some(7));
        assert_eq!(message.text(), Some("/start now"));
        assert!(!message.is_reply());
    }

    #[test]
    fn media_caption_and_unsupported_content() {
        let photo: MessageContent = serde_json::from_value(serde_json::json!({
            "@type": "messagePhoto",
            "photo": {"sizes": []},
            "caption": {"@type": "formattedText", "text": "sunset"}
        }))
        .unwrap();
        assert_eq!(photo.caption(), "sunset");
        assert!(photo.is_media());

        let dice: MessageContent =
            serde_json::from_value(serde_json::json!({"@type": "messageDice", "value": 3}))
                .unwrap();
        assert_eq!(dice, MessageContent::Unsupported);
        assert_eq!(dice.caption(), "");
    }
}
