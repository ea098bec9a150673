//! Inbound webhook envelope.
//!
//! Telegram sends an `Update` object with exactly one payload field set. The
//! wire shape is a struct of optional fields; it is collapsed into [`Event`]
//! on decode, taking the first populated field in [`Event`]'s declaration
//! order. Only the parts of each payload that drive the bot are modelled.

use serde::Deserialize;

use crate::platform::User;

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    pub fn is_supergroup(&self) -> bool {
        self.kind == "supergroup"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    BotCommand,
    Mention,
    TextMention,
    #[serde(other)]
    Other,
}

/// A formatting annotation on message text. Offsets are in UTF-16 code units.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i32,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

/// Any non-message payload; only its sender matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub from: Option<User>,
}

/// The payload of an update, highest priority first.
#[derive(Debug, Clone)]
pub enum Event {
    Message(Message),
    EditedMessage(Message),
    ChannelPost(Message),
    EditedChannelPost(Message),
    InlineQuery(Query),
    ChosenInlineResult(Query),
    CallbackQuery(Query),
    PreCheckoutQuery(Query),
    ShippingQuery(Query),
    /// No recognised payload was present
    Unsupported,
}

impl Event {
    /// The user who caused this event, if the payload names one
    pub fn sender(&self) -> Option<&User> {
        match self {
            Event::Message(m)
            | Event::EditedMessage(m)
            | Event::ChannelPost(m)
            | Event::EditedChannelPost(m) => m.from.as_ref(),
            Event::InlineQuery(q)
            | Event::ChosenInlineResult(q)
            | Event::CallbackQuery(q)
            | Event::PreCheckoutQuery(q)
            | Event::ShippingQuery(q) => q.from.as_ref(),
            Event::Unsupported => None,
        }
    }

    /// The chat message this event carries, for plain and edited messages only
    pub fn message(&self) -> Option<&Message> {
        match self {
            Event::Message(m) | Event::EditedMessage(m) => Some(m),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Message(_) => "message",
            Event::EditedMessage(_) => "edited_message",
            Event::ChannelPost(_) => "channel_post",
            Event::EditedChannelPost(_) => "edited_channel_post",
            Event::InlineQuery(_) => "inline_query",
            Event::ChosenInlineResult(_) => "chosen_inline_result",
            Event::CallbackQuery(_) => "callback_query",
            Event::PreCheckoutQuery(_) => "pre_checkout_query",
            Event::ShippingQuery(_) => "shipping_query",
            Event::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<Message>,
    edited_message: Option<Message>,
    channel_post: Option<Message>,
    edited_channel_post: Option<Message>,
    inline_query: Option<Query>,
    chosen_inline_result: Option<Query>,
    callback_query: Option<Query>,
    pre_checkout_query: Option<Query>,
    shipping_query: Option<Query>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawUpdate")]
pub struct Update {
    pub id: i64,
    pub event: Event,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        let event = if let Some(m) = raw.message {
            Event::Message(m)
        } else if let Some(m) = raw.edited_message {
            Event::EditedMessage(m)
        } else if let Some(m) = raw.channel_post {
            Event::ChannelPost(m)
        } else if let Some(m) = raw.edited_channel_post {
            Event::EditedChannelPost(m)
        } else if let Some(q) = raw.inline_query {
            Event::InlineQuery(q)
        } else if let Some(q) = raw.chosen_inline_result {
            Event::ChosenInlineResult(q)
        } else if let Some(q) = raw.callback_query {
            Event::CallbackQuery(q)
        } else if let Some(q) = raw.pre_checkout_query {
            Event::PreCheckoutQuery(q)
        } else if let Some(q) = raw.shipping_query {
            Event::ShippingQuery(q)
        } else {
            Event::Unsupported
        };

        Update {
            id: raw.update_id,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_supergroup_message() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 7,
                "message": {
                    "message_id": 10,
                    "date": 1700000000,
                    "from": {"id": 1, "is_bot": false, "first_name": "Mod", "username": "mod"},
                    "chat": {"id": -1001, "type": "supergroup", "title": "Test"},
                    "text": "/ban @spammer",
                    "entities": [
                        {"type": "bot_command", "offset": 0, "length": 4},
                        {"type": "mention", "offset": 5, "length": 8},
                        {"type": "hashtag", "offset": 0, "length": 1}
                    ]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(update.id, 7);
        let message = update.event.message().unwrap();
        assert!(message.chat.is_supergroup());
        assert_eq!(message.chat.title.as_deref(), Some("Test"));
        assert_eq!(message.entities[0].kind, EntityKind::BotCommand);
        assert_eq!(message.entities[2].kind, EntityKind::Other);
        assert_eq!(update.event.sender().unwrap().handle(), "mod");
    }

    #[test]
    fn test_first_populated_payload_wins() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 1,
                "callback_query": {"id": "x", "from": {"id": 5, "first_name": "Cb"}},
                "edited_message": {
                    "message_id": 3,
                    "from": {"id": 6, "first_name": "Ed"},
                    "chat": {"id": 9, "type": "private"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(update.event.kind(), "edited_message");
        assert_eq!(update.event.sender().unwrap().id, 6);
        assert!(update.event.message().is_some());
    }

    #[test]
    fn test_non_message_events_have_sender_but_no_message() {
        let update: Update = serde_json::from_str(
            r#"{"update_id": 2, "inline_query": {"id": "q", "query": "", "from": {"id": 8, "first_name": "In"}}}"#,
        )
        .unwrap();

        assert_eq!(update.event.kind(), "inline_query");
        assert_eq!(update.event.sender().unwrap().id, 8);
        assert!(update.event.message().is_none());
    }

    #[test]
    fn test_channel_post_is_not_a_message() {
        let update: Update = serde_json::from_str(
            r#"{"update_id": 3, "channel_post": {"message_id": 1, "chat": {"id": -5, "type": "channel"}}}"#,
        )
        .unwrap();

        assert_eq!(update.event.kind(), "channel_post");
        assert!(update.event.sender().is_none());
        assert!(update.event.message().is_none());
    }

    #[test]
    fn test_empty_update_is_unsupported() {
        let update: Update = serde_json::from_str(r#"{"update_id": 4}"#).unwrap();
        assert!(matches!(update.event, Event::Unsupported));
        assert!(update.event.sender().is_none());
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        assert!(serde_json::from_str::<Update>("").is_err());
        assert!(serde_json::from_str::<Update>("{not json").is_err());
        assert!(serde_json::from_str::<Update>(r#"{"message": {}}"#).is_err());
    }
}
