pub mod telegram;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// A platform user as it appears in updates and chat member lookups
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// First and last name joined with a space (last name omitted when empty)
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    /// The public handle, or an empty string when the user has none
    pub fn handle(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.full_name();
        match self.username.as_deref() {
            Some(handle) if !handle.is_empty() => write!(f, "{} ({})", name, handle),
            _ => write!(f, "{}", name),
        }
    }
}

/// Membership status reported by the platform for a user in a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Creator => "creator",
            MemberStatus::Administrator => "administrator",
            MemberStatus::Member => "member",
            MemberStatus::Restricted => "restricted",
            MemberStatus::Left => "left",
            MemberStatus::Kicked => "kicked",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's live standing in a specific chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMember {
    pub user: User,
    pub status: MemberStatus,
    pub can_promote_members: bool,
}

/// Administrator rights passed to `promote_chat_member`.
/// All-false demotes the user back to a regular member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdminRights {
    pub can_change_info: bool,
    pub can_delete_messages: bool,
    pub can_invite_users: bool,
    pub can_restrict_members: bool,
    pub can_pin_messages: bool,
    pub can_promote_members: bool,
}

impl AdminRights {
    /// Rights granted to a moderator: clean up messages and pin them, nothing else
    pub fn moderator() -> Self {
        Self {
            can_delete_messages: true,
            can_pin_messages: true,
            ..Self::default()
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// The moderation platform's HTTP API, reduced to the calls the bot makes.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn send_message(&self, chat_id: i64, reply_to: i32, text: &str) -> Result<()>;

    async fn get_chat_administrators(&self, chat_id: i64) -> Result<Vec<ChatMember>>;

    async fn get_chat_member(&self, chat_id: i64, user_id: u64) -> Result<ChatMember>;

    async fn promote_chat_member(
        &self,
        chat_id: i64,
        user_id: u64,
        rights: AdminRights,
    ) -> Result<()>;

    async fn kick_chat_member(&self, chat_id: i64, user_id: u64) -> Result<()>;

    async fn unban_chat_member(&self, chat_id: i64, user_id: u64) -> Result<()>;
}
