//! Telegram notification — login, chat resolution, and photo delivery.

use crate::capture::Frame;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};
use teloxide::{ApiError, RequestError};
use thiserror::Error;
use tracing::info;

/// Startup-time failures: bad credentials or an unusable destination chat.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("telegram login failed: {0}")]
    Auth(RequestError),
    #[error("chat {0} not found (check TELEGRAM_CHAT_ID)")]
    ChatNotFound(i64),
    #[error("could not resolve chat {0}: {1}")]
    Chat(i64, RequestError),
}

/// Per-notification failures. These are logged by the caller and never
/// interrupt the monitoring cadence.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("attachment encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("telegram send failed: {0}")]
    Send(#[from] RequestError),
}

/// A message plus the frame that triggered it, consumed by one send.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub message: String,
    pub frame: Frame,
}

impl NotificationRequest {
    /// The standard change alert, naming the detected score.
    pub fn screen_change(score: u64, frame: Frame) -> Self {
        Self {
            message: format!("Motion detected! {score} pixels changed since the last capture."),
            frame,
        }
    }
}

#[async_trait]
pub trait Notifier {
    async fn notify(&self, request: NotificationRequest) -> Result<(), DeliveryError>;
}

/// Sends change alerts as photo messages to a fixed Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    /// Log in and resolve the destination chat. Fails fast so credential
    /// problems surface before the monitor loop starts.
    pub async fn connect(token: &str, chat_id: i64) -> Result<Self, SetupError> {
        let bot = Bot::new(token);

        let me = bot.get_me().await.map_err(SetupError::Auth)?;
        info!("logged in as @{}", me.username());

        let chat = ChatId(chat_id);
        match bot.get_chat(chat).await {
            Ok(_) => {}
            Err(RequestError::Api(ApiError::ChatNotFound)) => {
                return Err(SetupError::ChatNotFound(chat_id))
            }
            Err(e) => return Err(SetupError::Chat(chat_id, e)),
        }

        Ok(Self { bot, chat_id: chat })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, request: NotificationRequest) -> Result<(), DeliveryError> {
        let png = request.frame.to_png()?;
        let name = format!(
            "screen-{}.png",
            request.frame.captured_at().format("%Y%m%dT%H%M%SZ")
        );
        let photo = InputFile::memory(png).file_name(name);

        self.bot
            .send_photo(self.chat_id, photo)
            .caption(request.message)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn screen_change_message_names_the_score() {
        let request = NotificationRequest::screen_change(1234, Frame::new(RgbaImage::new(2, 2)));
        assert!(request.message.contains("1234"), "{}", request.message);
    }
}
