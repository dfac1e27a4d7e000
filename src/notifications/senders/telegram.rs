use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{NotificationSender, SenderError};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Server-side wait requested from `getUpdates`.
pub const LONG_POLL_TIMEOUT_SECS: u64 = 30;
// Must outlast a long poll; a half-open connection still fails eventually.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(LONG_POLL_TIMEOUT_SECS + 10);

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Envelope every Bot API method answers with.
#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

/// Thin client for the Telegram Bot API methods the bot needs.
pub struct TelegramApi {
    client: Client,
    bot_token: String,
}

impl TelegramApi {
    pub fn new(bot_token: impl Into<String>) -> Result<Self, SenderError> {
        let bot_token = bot_token.into();
        if bot_token.trim().is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Telegram bot token is empty.".to_string(),
            ));
        }
        let client = Client::builder().timeout(CLIENT_TIMEOUT).build()?;
        Ok(Self { client, bot_token })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_URL}/bot{}/{method}", self.bot_token)
    }

    async fn call<P, T>(&self, method: &str, payload: &P) -> Result<T, SenderError>
    where
        P: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Telegram API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        let body: ApiResponse<T> = response.json().await?;
        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(SenderError::SendFailed(format!(
                "Telegram API call '{method}' failed: {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    /// Sends plain text; no parse mode, so listing titles are delivered as-is.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), SenderError> {
        let payload = SendMessageRequest {
            chat_id,
            text,
            disable_web_page_preview: false,
        };
        let _: serde_json::Value = self.call("sendMessage", &payload).await?;
        Ok(())
    }

    /// Long-polls for new messages. `offset` acknowledges everything before it.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, SenderError> {
        let payload = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &payload).await
    }
}

/// A sender for pushing listing alerts into one Telegram chat.
pub struct TelegramSender {
    api: Arc<TelegramApi>,
    chat_id: String,
}

impl TelegramSender {
    pub fn new(api: Arc<TelegramApi>, chat_id: impl Into<String>) -> Result<Self, SenderError> {
        let chat_id = chat_id.into();
        if chat_id.trim().is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Telegram chat id is empty.".to_string(),
            ));
        }
        Ok(Self { api, chat_id })
    }
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn send(&self, message: &str) -> Result<(), SenderError> {
        self.api.send_message(&self.chat_id, message).await
    }
}
