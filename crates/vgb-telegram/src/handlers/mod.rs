//! Telegram update handlers.
//!
//! Group messages from actively muted users are deleted before anything else
//! runs; everything starting with `/` is routed to the command handlers.

use std::sync::Arc;

use chrono::Utc;
use teloxide::{prelude::*, types::Message};

use vgb_core::domain::{ChatId, MessageId, MessageRef, Subject, UserId};

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let in_group = msg.chat.is_group() || msg.chat.is_supergroup();

    if in_group {
        if let Some(user) = msg.from() {
            let subject = Subject::new(ChatId(msg.chat.id.0), UserId(user.id.0 as i64));
            if enforce_mute(&state, subject, MessageId(msg.id.0)).await {
                return Ok(());
            }
        }
    }

    if msg.text().is_some_and(|t| t.starts_with('/')) {
        return commands::handle_command(msg, state).await;
    }

    Ok(())
}

/// Delete the message if its author is muted right now. Returns whether it was.
async fn enforce_mute(state: &AppState, subject: Subject, message_id: MessageId) -> bool {
    let record = match state.store.get(subject).await {
        Ok(Some(r)) => r,
        Ok(None) => return false,
        Err(e) => {
            tracing::error!(error = %e, chat_id = subject.chat_id.0, "restriction lookup failed");
            return false;
        }
    };
    if !record.is_active_at(Utc::now()) {
        return false;
    }

    let msg = MessageRef {
        chat_id: subject.chat_id,
        message_id,
    };
    if let Err(e) = state.messenger.delete_message(msg).await {
        tracing::warn!(
            error = %e,
            chat_id = subject.chat_id.0,
            user_id = subject.user_id.0,
            "failed to delete message from muted user"
        );
    } else {
        tracing::debug!(
            chat_id = subject.chat_id.0,
            user_id = subject.user_id.0,
            "deleted message from muted user"
        );
    }
    true
}
