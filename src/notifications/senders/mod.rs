use async_trait::async_trait;
use thiserror::Error;

pub mod telegram;

pub use telegram::{TelegramApi, TelegramSender};

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Delivers text notifications to one fixed destination.
/// Implementations (e.g. Telegram) own their destination; callers only pass the text.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), SenderError>;
}
