use crate::platform::User;
use crate::update::{EntityKind, Message, MessageEntity};

/// The slash-commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Hello,
    Ban,
    Unban,
    List,
    Promote,
    Demote,
    Unknown,
}

impl Verb {
    pub fn from_command(command: &str) -> Self {
        match command {
            "/hello" => Verb::Hello,
            "/ban" => Verb::Ban,
            "/unban" => Verb::Unban,
            "/list" => Verb::List,
            "/promote" => Verb::Promote,
            "/demote" => Verb::Demote,
            _ => Verb::Unknown,
        }
    }

    /// Whether moderators may run this verb without administrator rights
    pub fn is_moderator_tier(&self) -> bool {
        matches!(self, Verb::Hello | Verb::Ban | Verb::Unban | Verb::List)
    }
}

/// A parsed bot command and the users it targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    /// Command text as typed, e.g. `/ban`
    pub name: String,
    /// Users the platform already resolved (`text_mention` entities)
    pub users: Vec<User>,
    /// `@handle` mentions with the `@` stripped, still to be verified
    pub handles: Vec<String>,
}

/// Extract `length` UTF-16 code units starting at `offset`.
/// Returns `None` when the span is out of range or cuts a surrogate pair.
fn utf16_span(units: &[u16], offset: usize, length: usize) -> Option<String> {
    let end = offset.checked_add(length)?;
    let span = units.get(offset..end)?;
    String::from_utf16(span).ok()
}

fn mention_handle(units: &[u16], entity: &MessageEntity) -> Option<String> {
    // Skip the leading '@'
    let start = entity.offset.checked_add(1)?;
    let length = entity.length.checked_sub(1)?;
    utf16_span(units, start, length)
}

/// Parse a message into a command.
///
/// Returns `None` unless the first entity is a `bot_command`.
pub fn parse(message: &Message) -> Option<Command> {
    let text = message.text.as_deref()?;
    let first = message.entities.first()?;
    if first.kind != EntityKind::BotCommand {
        return None;
    }

    // Entity offsets count UTF-16 code units
    let units: Vec<u16> = text.encode_utf16().collect();
    let name = utf16_span(&units, first.offset, first.length)?;
    let mut command = Command {
        verb: Verb::from_command(&name),
        name,
        users: Vec::new(),
        handles: Vec::new(),
    };

    for entity in &message.entities {
        match entity.kind {
            EntityKind::TextMention => {
                if let Some(user) = &entity.user {
                    command.users.push(user.clone());
                }
            }
            EntityKind::Mention => {
                if let Some(handle) = mention_handle(&units, entity) {
                    command.handles.push(handle);
                }
            }
            EntityKind::BotCommand | EntityKind::Other => {}
        }
    }

    Some(command)
}
