//! In-memory platform double for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::platform::{AdminRights, ChatMember, MemberStatus, Platform, User};

/// A user whose first name is the capitalised handle
pub fn user(id: u64, handle: &str) -> User {
    let mut chars = handle.chars();
    let first_name = match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    User {
        id,
        is_bot: false,
        first_name,
        last_name: None,
        username: Some(handle.to_string()),
    }
}

pub fn member(user: User, status: MemberStatus, can_promote_members: bool) -> ChatMember {
    ChatMember {
        user,
        status,
        can_promote_members,
    }
}

/// A platform call that changes state or talks to the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendMessage {
        chat_id: i64,
        reply_to: i32,
        text: String,
    },
    Promote {
        chat_id: i64,
        user_id: u64,
        rights: AdminRights,
    },
    Kick {
        chat_id: i64,
        user_id: u64,
    },
    Unban {
        chat_id: i64,
        user_id: u64,
    },
}

#[derive(Default)]
struct State {
    members: HashMap<u64, ChatMember>,
    admins: Vec<ChatMember>,
    admin_lookup_fails: bool,
    admin_lookup_stalls: bool,
    failing_users: HashSet<u64>,
    calls: Vec<Call>,
}

/// Records every outbound call; lookups are served from configured members.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a user visible to `get_chat_member`
    pub fn add_member(&self, member: ChatMember) {
        let mut state = self.state.lock().unwrap();
        state.members.insert(member.user.id, member);
    }

    /// Add a user to the chat's administrator list (and to `get_chat_member`)
    pub fn add_admin(&self, member: ChatMember) {
        let mut state = self.state.lock().unwrap();
        state.members.insert(member.user.id, member.clone());
        state.admins.push(member);
    }

    pub fn fail_admin_lookup(&self) {
        self.state.lock().unwrap().admin_lookup_fails = true;
    }

    /// Make `get_chat_administrators` hang forever
    pub fn stall_admin_lookup(&self) {
        self.state.lock().unwrap().admin_lookup_stalls = true;
    }

    /// Make every mutation targeting this user fail
    pub fn fail_for(&self, user_id: u64) {
        self.state.lock().unwrap().failing_users.insert(user_id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendMessage { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Calls other than `SendMessage`
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::SendMessage { .. }))
            .collect()
    }

    fn mutate(&self, user_id: u64, call: Call) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing_users.contains(&user_id) {
            anyhow::bail!("Bad Request: user {} is not mutable", user_id);
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn send_message(&self, chat_id: i64, reply_to: i32, text: &str) -> Result<()> {
        self.state.lock().unwrap().calls.push(Call::SendMessage {
            chat_id,
            reply_to,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn get_chat_administrators(&self, _chat_id: i64) -> Result<Vec<ChatMember>> {
        let stalls = self.state.lock().unwrap().admin_lookup_stalls;
        if stalls {
            std::future::pending::<()>().await;
        }
        let state = self.state.lock().unwrap();
        if state.admin_lookup_fails {
            anyhow::bail!("getChatAdministrators failed: connection reset");
        }
        Ok(state.admins.clone())
    }

    async fn get_chat_member(&self, _chat_id: i64, user_id: u64) -> Result<ChatMember> {
        let state = self.state.lock().unwrap();
        match state.members.get(&user_id) {
            Some(member) => Ok(member.clone()),
            None => anyhow::bail!("Bad Request: user {} not found", user_id),
        }
    }

    async fn promote_chat_member(
        &self,
        chat_id: i64,
        user_id: u64,
        rights: AdminRights,
    ) -> Result<()> {
        self.mutate(
            user_id,
            Call::Promote {
                chat_id,
                user_id,
                rights,
            },
        )
    }

    async fn kick_chat_member(&self, chat_id: i64, user_id: u64) -> Result<()> {
        self.mutate(user_id, Call::Kick { chat_id, user_id })
    }

    async fn unban_chat_member(&self, chat_id: i64, user_id: u64) -> Result<()> {
        self.mutate(user_id, Call::Unban { chat_id, user_id })
    }
}
