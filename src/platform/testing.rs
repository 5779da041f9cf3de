use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{MessageRef, Transport};
use crate::categories::Category;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text {
        chat_id: i64,
        text: String,
    },
    Photo {
        chat_id: i64,
        file_id: String,
        caption: String,
    },
    Document {
        chat_id: i64,
        file_id: String,
        caption: String,
    },
    Menu {
        chat_id: i64,
        text: String,
        keys: Vec<&'static str>,
    },
    CallbackAnswer {
        query_id: String,
    },
    Edit {
        message: MessageRef,
        text: String,
    },
}

/// Records every outbound call. Sends to the chat in `fail_chat` error out
/// without being recorded, like a user who blocked the bot.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Outbound>>,
    fail_chat: Option<i64>,
}

impl RecordingTransport {
    pub fn failing_for(chat_id: i64) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_chat: Some(chat_id),
        }
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<Outbound> {
        self.sent()
            .into_iter()
            .filter(|o| match o {
                Outbound::Text { chat_id: c, .. }
                | Outbound::Photo { chat_id: c, .. }
                | Outbound::Document { chat_id: c, .. }
                | Outbound::Menu { chat_id: c, .. } => *c == chat_id,
                Outbound::Edit { message, .. } => message.chat_id == chat_id,
                Outbound::CallbackAnswer { .. } => false,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    fn record(&self, chat_id: Option<i64>, outbound: Outbound) -> Result<()> {
        if chat_id.is_some() && chat_id == self.fail_chat {
            bail!("Forbidden: bot was blocked by the user");
        }
        self.sent.lock().unwrap().push(outbound);
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.record(
            Some(chat_id),
            Outbound::Text {
                chat_id,
                text: text.to_string(),
            },
        )
    }

    async fn send_photo(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()> {
        self.record(
            Some(chat_id),
            Outbound::Photo {
                chat_id,
                file_id: file_id.to_string(),
                caption: caption.to_string(),
            },
        )
    }

    async fn send_document(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()> {
        self.record(
            Some(chat_id),
            Outbound::Document {
                chat_id,
                file_id: file_id.to_string(),
                caption: caption.to_string(),
            },
        )
    }

    async fn send_menu(&self, chat_id: i64, text: &str, categories: &[Category]) -> Result<()> {
        self.record(
            Some(chat_id),
            Outbound::Menu {
                chat_id,
                text: text.to_string(),
                keys: categories.iter().map(|c| c.key).collect(),
            },
        )
    }

    async fn answer_callback(&self, query_id: &str) -> Result<()> {
        self.record(
            None,
            Outbound::CallbackAnswer {
                query_id: query_id.to_string(),
            },
        )
    }

    async fn edit_text(&self, message: MessageRef, text: &str) -> Result<()> {
        self.record(
            Some(message.chat_id),
            Outbound::Edit {
                message,
                text: text.to_string(),
            },
        )
    }
}
