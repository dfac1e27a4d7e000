pub mod config;
pub mod version;

pub mod monitor;
pub mod scanner;
pub mod notifications;
pub mod bot; // Command surface and Telegram transport
