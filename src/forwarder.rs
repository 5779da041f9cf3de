use anyhow::Result;

use crate::categories::Category;
use crate::platform::{Content, Sender, Transport};

/// Telegram's limit for a text message
const MAX_TEXT_LEN: usize = 4096;
/// Telegram's limit for a media caption
const MAX_CAPTION_LEN: usize = 1024;

const BODY_SEPARATOR: &str = "\n\n---\n";

/// Header placed above every forwarded message.
///
/// The `👤 user identifier: <id>` line is what the reply router parses, so its
/// wording must stay stable and it must stay on a line of its own.
pub fn build_header(sender: &Sender, category: &Category) -> String {
    let name = single_line(&sender.full_name);
    let who = match sender.username.as_deref() {
        Some(username) => format!("{} (@{})", name, single_line(username)),
        None => name,
    };
    format!(
        "📩 new message from: {}\n👤 user identifier: {}\n📋 subject: {}",
        who, sender.user_id, category.label
    )
}

/// User-controlled header fields must not open a new header line
fn single_line(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Text sent to the admin for a plain text message
pub fn text_body(header: &str, text: &str) -> String {
    format!("{header}{BODY_SEPARATOR}{text}")
}

/// Admin-bound messages for a text body. The first one carries the header
/// and as much of the body as fits; the rest carry the remainder.
pub fn text_messages(header: &str, text: &str) -> Vec<String> {
    let prefix_len = header.len() + BODY_SEPARATOR.len();
    let first_budget = MAX_TEXT_LEN.saturating_sub(prefix_len).max(1);
    if text.len() <= first_budget {
        return vec![text_body(header, text)];
    }

    let head = split_message(text, first_budget)
        .into_iter()
        .next()
        .unwrap_or_default();
    let mut messages = vec![text_body(header, &head)];
    messages.extend(split_message(&text[head.len()..], MAX_TEXT_LEN));
    messages
}

/// Telegram measures caption length in UTF-16 code units
fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Caption for forwarded media. The header is always kept whole; only the
/// user's caption is cut to fit.
pub fn media_caption(header: &str, caption: Option<&str>) -> String {
    let Some(caption) = caption.filter(|c| !c.trim().is_empty()) else {
        return header.to_string();
    };
    let full = format!("{header}{BODY_SEPARATOR}{caption}");
    if utf16_len(&full) <= MAX_CAPTION_LEN {
        return full;
    }
    // One unit is left for the ellipsis
    let budget =
        MAX_CAPTION_LEN.saturating_sub(utf16_len(header) + utf16_len(BODY_SEPARATOR) + 1);
    if budget == 0 {
        return header.to_string();
    }
    let mut used = 0;
    let cut: String = caption
        .chars()
        .take_while(|c| {
            used += c.len_utf16();
            used <= budget
        })
        .collect();
    format!("{header}{BODY_SEPARATOR}{cut}…")
}

/// Split long messages for Telegram's 4096 char limit
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Relay classified content to the admin chat.
///
/// Photos and documents keep their type and carry the header as caption;
/// text is sent with the header prepended.
pub async fn forward(
    transport: &dyn Transport,
    admin_chat_id: i64,
    sender: &Sender,
    category: &Category,
    content: &Content,
) -> Result<()> {
    let header = build_header(sender, category);

    match content {
        Content::Photo { file_id, caption } => {
            let caption = media_caption(&header, caption.as_deref());
            transport
                .send_photo(admin_chat_id, file_id, &caption)
                .await?;
        }
        Content::Document { file_id, caption } => {
            let caption = media_caption(&header, caption.as_deref());
            transport
                .send_document(admin_chat_id, file_id, &caption)
                .await?;
        }
        Content::Text(text) => {
            for message in text_messages(&header, text) {
                transport.send_text(admin_chat_id, &message).await?;
            }
        }
    }

    Ok(())
}
