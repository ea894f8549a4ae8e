//! Telegram adapter (teloxide).
//!
//! Implements the `vgb-core` MessagingPort over the Bot API and hosts the
//! command surface.

use std::future::IntoFuture;

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode, ApiError, RequestError};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use vgb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

/// Flood-control waits honoured per request before giving up.
const FLOOD_RETRIES: usize = 1;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn message(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    /// Send `request()`, waiting out `RetryAfter` up to [`FLOOD_RETRIES`] times.
    async fn send<T, R>(&self, mut request: impl FnMut() -> R) -> std::result::Result<T, RequestError>
    where
        R: IntoFuture<Output = std::result::Result<T, RequestError>>,
        R::IntoFuture: Send,
    {
        let mut waited = 0usize;
        loop {
            match request().await {
                Err(RequestError::RetryAfter(wait)) if waited < FLOOD_RETRIES => {
                    waited += 1;
                    tracing::warn!(wait = ?wait, "telegram flood control, retrying");
                    sleep(wait).await;
                }
                other => return other,
            }
        }
    }
}

fn telegram_error(action: &str, e: RequestError) -> Error {
    Error::External(format!("telegram {action} failed: {e}"))
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let sent = self
            .send(|| {
                self.bot
                    .send_message(Self::chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
            })
            .await
            .map_err(|e| telegram_error("send", e))?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(sent.id.0),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        let outcome = self
            .send(|| {
                self.bot
                    .delete_message(Self::chat(msg.chat_id), Self::message(msg.message_id))
            })
            .await;

        match outcome {
            Ok(_) => Ok(()),
            // Already gone (another admin, or the user deleted it first).
            Err(RequestError::Api(ApiError::MessageToDeleteNotFound)) => Ok(()),
            Err(e) => Err(telegram_error("delete", e)),
        }
    }
}
