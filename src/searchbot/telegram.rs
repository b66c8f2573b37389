//! Telegram client using teloxide.

use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, FileId, InputFile, MessageId, ReplyParameters};
use tracing::{info, warn};

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(msg_id) = reply_to_message_id {
            let reply_params = ReplyParameters::new(MessageId(msg_id as i32));
            request = request.reply_parameters(reply_params);
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Send a photo hosted at an external URL.
    pub async fn send_photo_url(
        &self,
        chat_id: i64,
        photo_url: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        info!("📷 Sending photo to chat {}: {}", chat_id, photo_url);

        let url = url::Url::parse(photo_url).map_err(|e| format!("Invalid photo URL: {e}"))?;
        let mut request = self.bot.send_photo(ChatId(chat_id), InputFile::url(url));

        if let Some(msg_id) = reply_to_message_id {
            let reply_params = ReplyParameters::new(MessageId(msg_id as i32));
            request = request.reply_parameters(reply_params);
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send photo: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Send a video hosted at an external URL.
    pub async fn send_video_url(
        &self,
        chat_id: i64,
        video_url: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        info!("🎞️ Sending video to chat {}: {}", chat_id, video_url);

        let url = url::Url::parse(video_url).map_err(|e| format!("Invalid video URL: {e}"))?;
        let mut request = self.bot.send_video(ChatId(chat_id), InputFile::url(url));

        if let Some(msg_id) = reply_to_message_id {
            let reply_params = ReplyParameters::new(MessageId(msg_id as i32));
            request = request.reply_parameters(reply_params);
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send video: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Check whether a user is an administrator or owner of a chat.
    pub async fn is_chat_admin(&self, chat_id: i64, user_id: i64) -> Result<bool, String> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .await
            .map_err(|e| {
                let msg = format!("Failed to get chat member: {e}");
                warn!("{}", msg);
                msg
            })?;

        Ok(matches!(member.kind, ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_)))
    }

    /// Resolve a Telegram file id to a downloadable URL the search API can
    /// fetch.
    pub async fn file_url(&self, file_id: &str) -> Result<String, String> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| format!("Failed to get file info: {e}"))?;

        Ok(format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        ))
    }
}
