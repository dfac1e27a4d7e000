pub mod message;
pub mod senders;

pub use message::format_listing_message;
pub use senders::{NotificationSender, SenderError};
