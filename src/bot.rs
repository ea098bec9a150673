use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::command::{self, Command, Verb};
use crate::directory::{Directory, DirectoryEntry};
use crate::members::{self, Role};
use crate::platform::{AdminRights, Platform, User};
use crate::update::{Message, Update};

/// Shared application state, built once at startup
pub struct AppState {
    pub platform: Arc<dyn Platform>,
    pub directory: Arc<dyn Directory>,
}

impl AppState {
    pub fn new(platform: Arc<dyn Platform>, directory: Arc<dyn Directory>) -> Self {
        Self {
            platform,
            directory,
        }
    }
}

/// A platform mutation applied to each resolved target
#[derive(Debug, Clone, Copy)]
enum Action {
    Kick,
    Unban,
    Promote,
    Demote,
}

impl Action {
    async fn apply(self, platform: &dyn Platform, chat_id: i64, user: &User) -> Result<()> {
        match self {
            Action::Kick => platform.kick_chat_member(chat_id, user.id).await,
            Action::Unban => platform.unban_chat_member(chat_id, user.id).await,
            Action::Promote => {
                platform
                    .promote_chat_member(chat_id, user.id, AdminRights::moderator())
                    .await
            }
            Action::Demote => {
                platform
                    .promote_chat_member(chat_id, user.id, AdminRights::none())
                    .await
            }
        }
    }
}

/// Per-target results of a batch action
#[derive(Debug, Default)]
struct BatchOutcome {
    succeeded: Vec<String>,
    failed: Vec<String>,
}

/// Apply `action` to every target, one call at a time.
/// A failing target is recorded and does not stop the rest.
async fn run_batch(
    platform: &dyn Platform,
    chat_id: i64,
    action: Action,
    targets: &[User],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for user in targets {
        match action.apply(platform, chat_id, user).await {
            Ok(()) => outcome.succeeded.push(user.to_string()),
            Err(e) => {
                error!("{:?} failed for {}: {:#}", action, user, e);
                outcome.failed.push(format!(
                    "{} ({}): {:#}",
                    user.handle(),
                    user.full_name(),
                    e
                ));
            }
        }
    }

    outcome
}

/// Reply in the chat; failures are logged only
async fn reply(state: &AppState, message: &Message, text: &str) {
    if let Err(e) = state
        .platform
        .send_message(message.chat.id, message.message_id, text)
        .await
    {
        error!("Failed to send reply to chat {}: {:#}", message.chat.id, e);
    }
}

/// Record the sender in the directory. Best effort.
async fn record_sender(state: &AppState, user: &User) {
    let Some(username) = user.username.as_deref().filter(|u| !u.is_empty()) else {
        debug!("Not recording user {} without a username", user.id);
        return;
    };

    let entry = DirectoryEntry {
        username: username.to_string(),
        user_id: user.id,
        name: user.full_name(),
    };
    if let Err(e) = state.directory.upsert_user(&entry).await {
        error!("Error updating user {} in directory: {:#}", username, e);
    }
}

/// Process one inbound update.
///
/// Returns an error only when the caller's privileges could not be checked;
/// every other failure is logged and absorbed.
pub async fn handle_update(state: &AppState, update: Update) -> Result<()> {
    let Some(from) = update.event.sender() else {
        debug!("Update {} ({}) has no sender", update.id, update.event.kind());
        return Ok(());
    };

    if from.is_bot {
        return Ok(());
    }

    record_sender(state, from).await;

    let Some(message) = update.event.message() else {
        return Ok(());
    };

    if !message.chat.is_supergroup() {
        return Ok(());
    }

    let Some(command) = command::parse(message) else {
        return Ok(());
    };

    debug!(
        "Command received {} from {}. Mentions: {}, text mentions: {}",
        command.name,
        from,
        command.handles.join(";"),
        command.users.len()
    );

    let lookup = members::privileges(state.platform.as_ref(), message.chat.id, from.id).await;
    let privileges = match lookup {
        Ok(p) => p,
        Err(e) => {
            error!("Could not check privileges of {}: {:#}", from, e);
            reply(state, message, "Could not check user privileges.").await;
            return Err(e.context("Could not check user privileges"));
        }
    };

    if !privileges.is_moderator {
        return Ok(());
    }

    if command.verb.is_moderator_tier() {
        run_moderator_command(state, message, from, &command, privileges.is_administrator).await;
        return Ok(());
    }

    if !privileges.is_administrator {
        warn!(
            "Non-administrator trying administrator command: {}, {}",
            command.name, from
        );
        return Ok(());
    }

    run_administrator_command(state, message, from, &command).await;
    Ok(())
}

async fn run_moderator_command(
    state: &AppState,
    message: &Message,
    from: &User,
    command: &Command,
    is_administrator: bool,
) {
    let platform = state.platform.as_ref();
    let directory = state.directory.as_ref();
    let chat_id = message.chat.id;

    let text = match command.verb {
        Verb::Hello => {
            let title = message.chat.title.as_deref().unwrap_or_default();
            let rank = if is_administrator {
                "an administrator"
            } else {
                "a moderator"
            };
            format!("Hi {}, welcome to {}! You are {}.", from.first_name, title, rank)
        }
        Verb::Ban => {
            let targets =
                members::resolve(platform, directory, chat_id, command, Role::Regular).await;
            let outcome = run_batch(platform, chat_id, Action::Kick, &targets).await;
            summary(&outcome.succeeded, "No members banned.", "Banned user(s)")
        }
        Verb::Unban => {
            let targets =
                members::resolve(platform, directory, chat_id, command, Role::Kicked).await;
            let outcome = run_batch(platform, chat_id, Action::Unban, &targets).await;
            summary(&outcome.succeeded, "No members unbanned.", "Unbanned user(s)")
        }
        Verb::List => {
            let moderators = members::list_moderators(platform, chat_id).await;
            summary(&moderators, "No moderators found.", "Moderators:")
        }
        Verb::Promote | Verb::Demote | Verb::Unknown => return,
    };

    reply(state, message, &text).await;
}

async fn run_administrator_command(
    state: &AppState,
    message: &Message,
    from: &User,
    command: &Command,
) {
    let platform = state.platform.as_ref();
    let directory = state.directory.as_ref();
    let chat_id = message.chat.id;

    let (outcome, empty, prefix) = match command.verb {
        Verb::Promote => {
            let targets =
                members::resolve(platform, directory, chat_id, command, Role::Regular).await;
            (
                run_batch(platform, chat_id, Action::Promote, &targets).await,
                "No moderators added.",
                "Added moderator(s)",
            )
        }
        Verb::Demote => {
            let targets =
                members::resolve(platform, directory, chat_id, command, Role::Moderator).await;
            (
                run_batch(platform, chat_id, Action::Demote, &targets).await,
                "No moderators removed.",
                "Removed moderator(s)",
            )
        }
        _ => {
            let text = format!(
                "Sorry {}, I didn't get that. Try saying '/hello'.",
                from.first_name
            );
            reply(state, message, &text).await;
            return;
        }
    };

    info!("{} by {}: {:?}", command.name, from, outcome.succeeded);
    reply(state, message, &summary(&outcome.succeeded, empty, prefix)).await;

    if !outcome.failed.is_empty() {
        let text = format!("Errors: {}.", outcome.failed.join("; "));
        reply(state, message, &text).await;
    }
}

/// `"<prefix> a,b."`, or `empty` when there is nothing to list
fn summary(items: &[String], empty: &str, prefix: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        format!("{} {}.", prefix, items.join(","))
    }
}
