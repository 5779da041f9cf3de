use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::categories::{self, CATEGORIES};
use crate::config::Config;
use crate::forwarder;
use crate::platform::{Command, Content, Incoming, MessageRef, Sender, Transport};
use crate::reply_router;
use crate::session::{ConversationState, SessionStore};

const GREETING: &str = "Welcome to the academic team contact bot.\n\n\
                        Please choose the nature of your message first:";
const CANCELLED: &str = "Operation cancelled. You can start again by sending /start.";
const FORWARD_OK: &str = "✅ Thank you. Your message has been sent successfully and will be reviewed soon.";
const FORWARD_FAILED: &str = "Sorry, something went wrong. Please try again.";

fn category_chosen(label: &str) -> String {
    format!("Selected: {label}.\n\nNow send your message (text, photo, or file).")
}

/// Routes incoming events: admin replies first, then the per-user
/// conversation keyed by (session state, event kind).
pub struct Relay {
    transport: Arc<dyn Transport>,
    sessions: SessionStore,
    admin_chat_id: i64,
}

impl Relay {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sessions: SessionStore::new(config.idle_timeout()),
            admin_chat_id: config.admin_chat_id(),
        }
    }

    pub fn admin_chat_id(&self) -> i64 {
        self.admin_chat_id
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn dispatch(&self, incoming: Incoming) -> Result<()> {
        self.dispatch_at(incoming, Utc::now()).await
    }

    pub async fn dispatch_at(&self, incoming: Incoming, now: DateTime<Utc>) -> Result<()> {
        let (sender, event) = match incoming {
            Incoming::AdminReply {
                chat_id,
                reply_text,
                replied_to,
            } => {
                if chat_id == self.admin_chat_id {
                    self.admin_reply(replied_to.as_deref(), &reply_text).await?;
                } else {
                    debug!("Ignoring reply from non-admin chat {}", chat_id);
                }
                return Ok(());
            }
            Incoming::Command { sender, command } => {
                return match command {
                    Command::Start => self.start(&sender, now).await,
                    Command::Cancel => self.cancel(&sender, now).await,
                };
            }
            Incoming::Callback {
                sender,
                query_id,
                data,
                message,
            } => (
                sender,
                Event::Callback {
                    query_id,
                    data,
                    message,
                },
            ),
            Incoming::Content { sender, content } => (sender, Event::Content(content)),
        };

        let state = self.sessions.state(sender.user_id, now).await;
        match (state, event) {
            (
                Some(ConversationState::SelectingCategory),
                Event::Callback {
                    query_id,
                    data,
                    message,
                },
            ) => {
                self.select_category(&sender, &query_id, &data, message, now)
                    .await
            }
            (Some(ConversationState::AwaitingMessage(_)), Event::Content(content)) => {
                self.forward(&sender, &content, now).await
            }
            (_, Event::Callback { query_id, .. }) => {
                debug!("Stale menu press from user {}", sender.user_id);
                self.transport.answer_callback(&query_id).await
            }
            (Some(ConversationState::SelectingCategory), Event::Content(_)) => {
                debug!(
                    "User {} sent content before choosing a category",
                    sender.user_id
                );
                Ok(())
            }
            (None, Event::Content(_)) => Ok(()),
        }
    }

    async fn start(&self, sender: &Sender, now: DateTime<Utc>) -> Result<()> {
        if self.sessions.start(sender.user_id, now).await {
            info!("User {} restarted their session", sender.user_id);
        } else {
            info!("User {} started a session", sender.user_id);
        }
        self.transport
            .send_menu(sender.chat_id, GREETING, &CATEGORIES)
            .await
    }

    async fn cancel(&self, sender: &Sender, now: DateTime<Utc>) -> Result<()> {
        if self.sessions.end(sender.user_id, now).await {
            info!("User {} cancelled their session", sender.user_id);
        }
        self.transport.send_text(sender.chat_id, CANCELLED).await
    }

    async fn select_category(
        &self,
        sender: &Sender,
        query_id: &str,
        data: &str,
        message: Option<MessageRef>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.transport.answer_callback(query_id).await?;

        let Some(category) = categories::find(data) else {
            warn!("Unknown category key from user {}: {}", sender.user_id, data);
            return Ok(());
        };
        if !self
            .sessions
            .select_category(sender.user_id, category, now)
            .await
        {
            return Ok(());
        }
        info!("User {} selected category '{}'", sender.user_id, category.key);

        let prompt = category_chosen(category.label);
        match message {
            Some(message) => self.transport.edit_text(message, &prompt).await,
            None => self.transport.send_text(sender.chat_id, &prompt).await,
        }
    }

    async fn forward(&self, sender: &Sender, content: &Content, now: DateTime<Utc>) -> Result<()> {
        // The session ends here whether or not delivery succeeds
        let Some(category) = self.sessions.take_awaiting(sender.user_id, now).await else {
            return Ok(());
        };

        match forwarder::forward(
            self.transport.as_ref(),
            self.admin_chat_id,
            sender,
            category,
            content,
        )
        .await
        {
            Ok(()) => {
                info!(
                    "Forwarded message from user {} ({})",
                    sender.user_id, category.key
                );
                self.transport.send_text(sender.chat_id, FORWARD_OK).await
            }
            Err(e) => {
                error!(
                    "Failed to forward message from user {}: {:#}",
                    sender.user_id, e
                );
                self.transport.send_text(sender.chat_id, FORWARD_FAILED).await
            }
        }
    }

    async fn admin_reply(&self, replied_to: Option<&str>, reply_text: &str) -> Result<()> {
        let outcome = reply_router::route_reply(
            self.transport.as_ref(),
            self.admin_chat_id,
            replied_to,
            reply_text,
        )
        .await?;
        debug!("Admin reply outcome: {:?}", outcome);
        Ok(())
    }

    /// Drop idle sessions. Called from the scheduler.
    pub async fn sweep_sessions(&self, now: DateTime<Utc>) -> usize {
        let removed = self.sessions.sweep(now).await;
        if removed > 0 {
            info!(
                "Expired {} idle session(s), {} active",
                removed,
                self.sessions.active_count().await
            );
        }
        removed
    }
}

/// Per-user events, after commands and admin replies are peeled off
enum Event {
    Callback {
        query_id: String,
        data: String,
        message: Option<MessageRef>,
    },
    Content(Content),
}
