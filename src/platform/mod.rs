pub mod telegram;
#[cfg(test)]
pub mod testing;

use anyhow::Result;
use async_trait::async_trait;

use crate::categories::Category;

/// The user behind an incoming event
#[derive(Debug, Clone)]
pub struct Sender {
    pub user_id: u64,
    /// Chat the user is talking from (their private chat for DMs)
    pub chat_id: i64,
    pub full_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
}

/// Message content that can be forwarded to the admin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Document {
        file_id: String,
        caption: Option<String>,
    },
}

/// A message previously sent by the bot, addressable for edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// A platform update reduced to what the relay acts on
#[derive(Debug, Clone)]
pub enum Incoming {
    Command {
        sender: Sender,
        command: Command,
    },
    Callback {
        sender: Sender,
        query_id: String,
        data: String,
        message: Option<MessageRef>,
    },
    Content {
        sender: Sender,
        content: Content,
    },
    /// Text from the admin chat replying to another message
    AdminReply {
        chat_id: i64,
        reply_text: String,
        /// Text or caption of the message being replied to
        replied_to: Option<String>,
    },
}

/// Outbound side of the chat platform
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    async fn send_photo(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()>;

    async fn send_document(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()>;

    /// Send `text` with one button per category, in order
    async fn send_menu(&self, chat_id: i64, text: &str, categories: &[Category]) -> Result<()>;

    async fn answer_callback(&self, query_id: &str) -> Result<()>;

    async fn edit_text(&self, message: MessageRef, text: &str) -> Result<()>;
}
