//! Target resolution and privilege checks.
//!
//! Every handle found in the directory is re-fetched from the live platform
//! before it is trusted; role state is never cached between commands.

use anyhow::Result;
use tracing::{debug, error, warn};

use crate::command::Command;
use crate::directory::Directory;
use crate::platform::{ChatMember, MemberStatus, Platform, User};

/// The bot's role taxonomy, used to filter command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Regular,
    /// Administrator without the right to promote members
    Moderator,
    /// Administrator with the right to promote members, or the creator
    #[cfg_attr(not(test), allow(dead_code))]
    Administrator,
    #[cfg_attr(not(test), allow(dead_code))]
    Creator,
    Kicked,
    #[cfg_attr(not(test), allow(dead_code))]
    Left,
}

impl ChatMember {
    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::Regular => self.status == MemberStatus::Member,
            Role::Creator => self.status == MemberStatus::Creator,
            Role::Kicked => self.status == MemberStatus::Kicked,
            Role::Left => self.status == MemberStatus::Left,
            Role::Moderator => {
                !(self.status != MemberStatus::Administrator || self.can_promote_members)
            }
            Role::Administrator => {
                (self.status == MemberStatus::Administrator && self.can_promote_members)
                    || self.status == MemberStatus::Creator
            }
        }
    }
}

/// What the caller of a command is allowed to do in a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Privileges {
    pub is_administrator: bool,
    pub is_moderator: bool,
}

/// Look the user up in the chat's administrator list.
/// Any administrator is a moderator; promote rights or ownership make them an
/// administrator too.
pub async fn privileges(platform: &dyn Platform, chat_id: i64, user_id: u64) -> Result<Privileges> {
    let admins = platform.get_chat_administrators(chat_id).await?;

    Ok(admins
        .iter()
        .find(|member| member.user.id == user_id)
        .map(|member| Privileges {
            is_administrator: member.can_promote_members
                || member.status == MemberStatus::Creator,
            is_moderator: true,
        })
        .unwrap_or_default())
}

/// Display names of the chat's moderators. Empty when the lookup fails.
pub async fn list_moderators(platform: &dyn Platform, chat_id: i64) -> Vec<String> {
    match platform.get_chat_administrators(chat_id).await {
        Ok(admins) => admins
            .iter()
            .filter(|member| member.has_role(Role::Moderator))
            .map(|member| member.user.to_string())
            .collect(),
        Err(e) => {
            error!("Failed to list moderators in chat {}: {:#}", chat_id, e);
            Vec::new()
        }
    }
}

/// Resolve a command's targets to verified users holding `role`.
///
/// Users attached to `text_mention` entities are passed through unchecked.
/// Handles go through the directory and are then verified live; anything that
/// cannot be verified is skipped rather than reported.
pub async fn resolve(
    platform: &dyn Platform,
    directory: &dyn Directory,
    chat_id: i64,
    command: &Command,
    role: Role,
) -> Vec<User> {
    let mut result: Vec<User> = command.users.clone();

    for handle in &command.handles {
        let entry = match directory.get_user(handle).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("User not found in directory: {}", handle);
                continue;
            }
            Err(e) => {
                debug!("Could not read directory entry for {}: {:#}", handle, e);
                continue;
            }
        };

        let member = match platform.get_chat_member(chat_id, entry.user_id).await {
            Ok(member) => member,
            Err(e) => {
                debug!("Could not verify {} with the platform: {:#}", handle, e);
                continue;
            }
        };

        if member.user.handle() != handle.as_str() {
            warn!(
                "Username changed since last recorded. Not listing as valid user: {}",
                handle
            );
            continue;
        }

        if member.user.is_bot {
            continue;
        }

        if !member.has_role(role) {
            debug!(
                "Skipping {}: status {} does not match {:?}",
                handle, member.status, role
            );
            continue;
        }

        result.push(member.user);
    }

    result
}
