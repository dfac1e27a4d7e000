//! Chat command surface: parsing, execution and the Telegram long-polling loop.
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::notifications::senders::SenderError;
use crate::notifications::senders::telegram::{LONG_POLL_TIMEOUT_SECS, TelegramApi, Update};

pub mod commands;
pub mod handler;

pub use commands::{Command, ParseError};
pub use handler::{CommandError, CommandHandler};

const DEFAULT_RETRY_DELAY_SECONDS: u64 = 5;
const MAX_RETRY_DELAY_SECONDS: u64 = 60;

/// The Bot API calls the command loop depends on.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, SenderError>;

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), SenderError>;
}

#[async_trait]
impl BotApi for TelegramApi {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, SenderError> {
        TelegramApi::get_updates(self, offset, timeout_secs).await
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), SenderError> {
        TelegramApi::send_message(self, chat_id, text).await
    }
}

/// Receives chat commands through `getUpdates` and answers each in its chat.
pub struct TelegramBot {
    api: Arc<dyn BotApi>,
    handler: CommandHandler,
}

impl TelegramBot {
    pub fn new(api: Arc<dyn BotApi>, handler: CommandHandler) -> Self {
        Self { api, handler }
    }

    /// Runs until `shutdown_rx` fires. API failures are logged and retried with backoff.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<()>) {
        let mut offset: Option<i64> = None;
        let mut retry_delay_seconds = DEFAULT_RETRY_DELAY_SECONDS;
        info!("Telegram command loop started.");

        loop {
            let updates = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                result = self.api.get_updates(offset, LONG_POLL_TIMEOUT_SECS) => result,
            };

            match updates {
                Ok(updates) => {
                    retry_delay_seconds = DEFAULT_RETRY_DELAY_SECONDS;
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.dispatch(update).await;
                    }
                }
                Err(e) => {
                    error!(error = %e, delay_seconds = retry_delay_seconds, "Failed to fetch Telegram updates. Will retry.");
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(Duration::from_secs(retry_delay_seconds)) => {}
                    }
                    retry_delay_seconds = (retry_delay_seconds * 2).min(MAX_RETRY_DELAY_SECONDS);
                }
            }
        }
        info!("Telegram command loop gracefully shut down.");
    }

    async fn dispatch(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(reply) = self.handler.handle_text(text) else {
            return;
        };
        let chat_id = message.chat.id.to_string();
        debug!(chat_id = %chat_id, command = %text, "Replying to command.");
        if let Err(e) = self.api.send_message(&chat_id, &reply).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to send command reply.");
        }
    }
}
