//! Telegram channel: sends one message through the Bot API `sendMessage` method.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channels::channel::{check_content, post_json};
use crate::channels::{Channel, ChannelKind, ChannelResult, Destination, OutboundMessage};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
pub const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// `sendMessage` body.
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// The fields read from a `sendMessage` response. Missing fields stay empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendMessageResponse {
    ok: bool,
    description: String,
    result: Option<SentMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SentMessage {
    message_id: Option<i64>,
    chat: Option<Chat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Chat {
    id: i64,
}

/// Telegram channel: the bot token travels with each message.
pub struct TelegramChannel {
    client: reqwest::Client,
    api_base: String,
}

impl TelegramChannel {
    pub fn new(client: reqwest::Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn api_url(&self, bot_token: &str, method: &str) -> String {
        format!("{}/bot{bot_token}/{method}", self.api_base)
    }

    async fn send_message(
        &self,
        bot_token: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<ChannelResult, ChannelError> {
        check_content(ChannelKind::Telegram, text, TELEGRAM_MAX_MESSAGE_LENGTH)?;

        let request = self.client.post(self.api_url(bot_token, "sendMessage"));
        let response = post_json(
            ChannelKind::Telegram,
            request,
            &SendMessageRequest { chat_id, text },
        )
        .await?;

        let parsed: SendMessageResponse = serde_json::from_slice(&response.body).unwrap_or_default();

        let result = if !parsed.ok {
            ChannelResult::failure(parsed.description)
        } else {
            let sent = parsed.result.unwrap_or_default();
            match sent.message_id {
                Some(message_id) => {
                    let result = ChannelResult::success(message_id.to_string());
                    match sent.chat {
                        Some(chat) => result.with_channel_id(chat.id.to_string()),
                        None => result,
                    }
                }
                None => ChannelResult::failure("telegram response carried no message id"),
            }
        };

        Ok(result.with_status(response.status).with_raw(response.raw()))
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send(&self, message: &OutboundMessage) -> ChannelResult {
        let Destination::TelegramChat { bot_token, chat_id } = &message.destination else {
            return ChannelError::InvalidDestination {
                name: "telegram".into(),
                reason: "expected a bot token and chat id".into(),
            }
            .into();
        };

        let result = self
            .send_message(bot_token.expose_secret(), chat_id, &message.content)
            .await
            .unwrap_or_else(ChannelResult::from);

        if result.ok {
            debug!(chat_id = %chat_id, message_id = %result.provider_message_id, "Telegram message sent");
        } else {
            warn!(chat_id = %chat_id, status = ?result.status, error = result.error(), "Telegram sendMessage failed");
        }
        result
    }
}
