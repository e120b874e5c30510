//! Telegram transport using teloxide.

use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, Recipient};
use tracing::{debug, warn};

use super::events::{Button, Menu, Notify};
use super::router::MembershipGate;

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send(&self, notify: &Notify) -> Result<i64, String> {
        let mut request = self.bot.send_message(ChatId(notify.external_id), &notify.text);
        if let Some(menu) = &notify.menu {
            request = request.reply_markup(keyboard(menu));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send to {}: {e}", notify.external_id);
            warn!("{}", msg);
            msg
        })
    }

    pub async fn edit(&self, chat_id: i64, message_id: i64, notify: &Notify) -> Result<(), String> {
        let mut request = self.bot.edit_message_text(ChatId(chat_id), MessageId(message_id as i32), &notify.text);
        if let Some(menu) = &notify.menu {
            request = request.reply_markup(keyboard(menu));
        }

        request.await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to edit message {message_id} in {chat_id}: {e}");
            debug!("{}", msg);
            msg
        })
    }

    /// Deliver a batch in order.
    ///
    /// With `origin` set, the first notification for that chat replaces the
    /// message whose button was pressed. If the edit fails it is sent instead.
    pub async fn deliver(&self, notifies: &[Notify], origin: Option<(i64, i64)>) {
        let mut origin = origin;
        for notify in notifies {
            if let Some((chat_id, message_id)) = origin
                && chat_id == notify.external_id
            {
                origin = None;
                if self.edit(chat_id, message_id, notify).await.is_ok() {
                    continue;
                }
            }
            // Already logged by `send`.
            self.send(notify).await.ok();
        }
    }
}

fn keyboard(menu: &Menu) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> =
        menu.rows.iter().map(|row| row.iter().filter_map(button).collect()).collect();
    InlineKeyboardMarkup::new(rows)
}

fn button(button: &Button) -> Option<InlineKeyboardButton> {
    match button {
        Button::Action { label, action } => Some(InlineKeyboardButton::callback(label.clone(), action.token())),
        Button::Url { label, url } => {
            let parsed = url.parse().ok();
            if parsed.is_none() {
                warn!("Dropping button {label:?} with invalid url {url:?}");
            }
            parsed.map(|u| InlineKeyboardButton::url(label.clone(), u))
        }
    }
}

/// Membership check against the configured public channels.
pub struct TelegramGate {
    bot: Bot,
    channels: Vec<String>,
}

impl TelegramGate {
    pub fn new(bot: Bot, channels: Vec<String>) -> Self {
        Self { bot, channels }
    }
}

impl MembershipGate for TelegramGate {
    async fn is_member(&self, external_id: i64) -> bool {
        for channel in &self.channels {
            let member = self
                .bot
                .get_chat_member(Recipient::ChannelUsername(channel.clone()), UserId(external_id as u64))
                .await;
            match member {
                Ok(member) => {
                    if matches!(member.kind, ChatMemberKind::Left | ChatMemberKind::Banned(_)) {
                        return false;
                    }
                }
                Err(e) => {
                    warn!("Membership check for {} in {} failed: {e}", external_id, channel);
                    return false;
                }
            }
        }
        true
    }
}
