use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::{info, warn};

use crate::platform::Transport;

/// Matches only a header line of its own, never text inside the sender's name
static USER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:👤 )?user identifier: (\d+)$").expect("valid regex")
});

const REPLY_PREFIX: &str = "✉️ Reply from the team:\n\n";
const REPLY_SENT: &str = "✅ Your reply was sent successfully.";
const REPLY_FAILED: &str = "Could not deliver the reply. The user may have blocked the bot.";

#[derive(Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    Delivered { user_id: i64 },
    Failed { user_id: i64 },
    /// The replied-to message carries no identifier; nothing was sent.
    NoIdentifier,
}

/// Pull the originating user id out of a forwarded header.
pub fn extract_user_id(text: &str) -> Option<i64> {
    USER_ID_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Relay an admin reply to the user named in the replied-to message and
/// report the result back to the admin chat.
pub async fn route_reply(
    transport: &dyn Transport,
    admin_chat_id: i64,
    replied_to: Option<&str>,
    reply_text: &str,
) -> Result<ReplyOutcome> {
    let Some(user_id) = replied_to.and_then(extract_user_id) else {
        return Ok(ReplyOutcome::NoIdentifier);
    };

    let message = format!("{REPLY_PREFIX}{reply_text}");
    match transport.send_text(user_id, &message).await {
        Ok(()) => {
            info!("Relayed admin reply to user {}", user_id);
            transport.send_text(admin_chat_id, REPLY_SENT).await?;
            Ok(ReplyOutcome::Delivered { user_id })
        }
        Err(e) => {
            warn!("Failed to relay admin reply to user {}: {:#}", user_id, e);
            transport
                .send_text(admin_chat_id, &format!("{REPLY_FAILED}\nError: {e}"))
                .await?;
            Ok(ReplyOutcome::Failed { user_id })
        }
    }
}
