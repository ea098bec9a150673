use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ChatMemberStatus, MessageId, ReplyParameters, UserId};
use tracing::{debug, info};

use crate::config::TelegramConfig;
use crate::platform::{AdminRights, ChatMember, MemberStatus, Platform, User};

/// Telegram Bot API client backed by a teloxide `Bot`
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client for Telegram")?;

        let mut bot = Bot::with_client(&config.bot_token, client);
        if let Some(api_url) = &config.api_url {
            let url = reqwest::Url::parse(api_url)
                .with_context(|| format!("Invalid Telegram API URL: {}", api_url))?;
            info!("Using Telegram API at {}", url);
            bot = bot.set_api_url(url);
        }

        Ok(Self { bot })
    }
}

fn convert_user(user: &teloxide::types::User) -> User {
    User {
        id: user.id.0,
        is_bot: user.is_bot,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}

fn convert_member(member: &teloxide::types::ChatMember) -> ChatMember {
    let status = match member.kind.status() {
        ChatMemberStatus::Owner => MemberStatus::Creator,
        ChatMemberStatus::Administrator => MemberStatus::Administrator,
        ChatMemberStatus::Member => MemberStatus::Member,
        ChatMemberStatus::Restricted => MemberStatus::Restricted,
        ChatMemberStatus::Left => MemberStatus::Left,
        ChatMemberStatus::Banned => MemberStatus::Kicked,
    };

    ChatMember {
        user: convert_user(&member.user),
        status,
        can_promote_members: member.kind.can_promote_members(),
    }
}

#[async_trait]
impl Platform for TelegramPlatform {
    async fn send_message(&self, chat_id: i64, reply_to: i32, text: &str) -> Result<()> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_parameters(ReplyParameters::new(MessageId(reply_to)))
            .disable_notification(true)
            .await
            .context("sendMessage failed")?;

        debug!("SendMessage: {}", sent.text().unwrap_or_default());
        Ok(())
    }

    async fn get_chat_administrators(&self, chat_id: i64) -> Result<Vec<ChatMember>> {
        let admins = self
            .bot
            .get_chat_administrators(ChatId(chat_id))
            .await
            .context("getChatAdministrators failed")?;

        Ok(admins.iter().map(convert_member).collect())
    }

    async fn get_chat_member(&self, chat_id: i64, user_id: u64) -> Result<ChatMember> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .with_context(|| format!("getChatMember failed for user {}", user_id))?;

        Ok(convert_member(&member))
    }

    async fn promote_chat_member(
        &self,
        chat_id: i64,
        user_id: u64,
        rights: AdminRights,
    ) -> Result<()> {
        self.bot
            .promote_chat_member(ChatId(chat_id), UserId(user_id))
            .can_change_info(rights.can_change_info)
            .can_delete_messages(rights.can_delete_messages)
            .can_invite_users(rights.can_invite_users)
            .can_restrict_members(rights.can_restrict_members)
            .can_pin_messages(rights.can_pin_messages)
            .can_promote_members(rights.can_promote_members)
            .await
            .with_context(|| format!("promoteChatMember failed for user {}", user_id))?;
        Ok(())
    }

    async fn kick_chat_member(&self, chat_id: i64, user_id: u64) -> Result<()> {
        self.bot
            .ban_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .with_context(|| format!("banChatMember failed for user {}", user_id))?;
        Ok(())
    }

    async fn unban_chat_member(&self, chat_id: i64, user_id: u64) -> Result<()> {
        self.bot
            .unban_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .with_context(|| format!("unbanChatMember failed for user {}", user_id))?;
        Ok(())
    }
}
