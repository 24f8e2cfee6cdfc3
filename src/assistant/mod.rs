pub mod client;
pub mod error;
pub mod types;

pub use client::{AssistantClient, MessageSender};
pub use error::AssistantError;
pub use types::{ContentBlock, Message, MessagesRequest, MessagesResponse, Usage};
