use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Me,
    MessageId, UserId,
};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use super::{Command, Content, Incoming, MessageRef, Sender, Transport};
use crate::categories::Category;
use crate::relay::Relay;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum BotCommand {
    #[command(description = "choose a subject and contact the team")]
    Start,
    #[command(description = "abort the current message")]
    Cancel,
}

impl From<BotCommand> for Command {
    fn from(cmd: BotCommand) -> Self {
        match cmd {
            BotCommand::Start => Command::Start,
            BotCommand::Cancel => Command::Cancel,
        }
    }
}

/// One button per category, one per row
pub fn category_keyboard(categories: &[Category]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        categories
            .iter()
            .map(|c| vec![InlineKeyboardButton::callback(c.label, c.key)]),
    )
}

/// `Transport` backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()> {
        self.bot
            .send_photo(ChatId(chat_id), InputFile::file_id(FileId(file_id.to_string())))
            .caption(caption)
            .await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<()> {
        self.bot
            .send_document(ChatId(chat_id), InputFile::file_id(FileId(file_id.to_string())))
            .caption(caption)
            .await?;
        Ok(())
    }

    async fn send_menu(&self, chat_id: i64, text: &str, categories: &[Category]) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(category_keyboard(categories))
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(CallbackQueryId(query_id.to_string()))
            .await?;
        Ok(())
    }

    async fn edit_text(&self, message: MessageRef, text: &str) -> Result<()> {
        self.bot
            .edit_message_text(
                ChatId(message.chat_id),
                MessageId(message.message_id),
                text,
            )
            .await?;
        Ok(())
    }
}

/// Run the long-polling dispatcher until shutdown
pub async fn run(bot: Bot, relay: Arc<Relay>) -> Result<()> {
    info!("Starting Telegram platform...");

    if let Err(e) = bot.set_my_commands(BotCommand::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![relay])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, me: Me, relay: Arc<Relay>) -> Result<()> {
    match message_to_incoming(&msg, me.id, me.username(), relay.admin_chat_id()) {
        Some(incoming) => relay.dispatch(incoming).await,
        None => {
            debug!("Ignoring message {} in chat {}", msg.id.0, msg.chat.id.0);
            Ok(())
        }
    }
}

async fn handle_callback(q: CallbackQuery, relay: Arc<Relay>) -> Result<()> {
    let Some(data) = q.data.clone() else {
        return Ok(());
    };

    let message = q.message.as_ref().map(|m| MessageRef {
        chat_id: m.chat().id.0,
        message_id: m.id().0,
    });
    let sender = Sender {
        user_id: q.from.id.0,
        chat_id: message
            .map(|m| m.chat_id)
            .unwrap_or(q.from.id.0 as i64),
        full_name: q.from.full_name(),
        username: q.from.username.clone(),
    };

    relay
        .dispatch(Incoming::Callback {
            sender,
            query_id: q.id.to_string(),
            data,
            message,
        })
        .await
}

/// Reduce a Telegram message to a relay event
fn message_to_incoming(
    msg: &Message,
    bot_id: UserId,
    bot_username: &str,
    admin_chat_id: i64,
) -> Option<Incoming> {
    if msg.chat.id.0 == admin_chat_id {
        if let Some(reply) = admin_reply(msg, bot_id) {
            return Some(reply);
        }
    }

    let user = msg.from.as_ref()?;
    let sender = Sender {
        user_id: user.id.0,
        chat_id: msg.chat.id.0,
        full_name: user.full_name(),
        username: user.username.clone(),
    };

    if let Some(text) = msg.text() {
        if let Ok(cmd) = BotCommand::parse(text, bot_username) {
            return Some(Incoming::Command {
                sender,
                command: cmd.into(),
            });
        }
        return Some(Incoming::Content {
            sender,
            content: Content::Text(text.to_string()),
        });
    }

    let caption = msg.caption().map(String::from);
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(Incoming::Content {
            sender,
            content: Content::Photo {
                file_id: photo.file.id.to_string(),
                caption,
            },
        });
    }
    if let Some(doc) = msg.document() {
        return Some(Incoming::Content {
            sender,
            content: Content::Document {
                file_id: doc.file.id.to_string(),
                caption,
            },
        });
    }

    None
}

/// Non-command text in the admin chat that replies to one of our messages
fn admin_reply(msg: &Message, bot_id: UserId) -> Option<Incoming> {
    let text = msg.text()?;
    if text.starts_with('/') {
        return None;
    }
    let original = msg.reply_to_message()?;
    if !original.from.as_ref().is_some_and(|u| u.id == bot_id) {
        return None;
    }

    Some(Incoming::AdminReply {
        chat_id: msg.chat.id.0,
        reply_text: text.to_string(),
        replied_to: original
            .text()
            .or_else(|| original.caption())
            .map(String::from),
    })
}
