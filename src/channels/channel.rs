//! Channel capability: outbound message types, the `Channel` trait, and the
//! per-kind registry the routes select clients from.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;

use crate::config::GatewayConfig;
use crate::error::ChannelError;
use crate::store::Post;

use super::discord::DiscordChannel;
use super::telegram::TelegramChannel;

/// The closed set of providers the gateway publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Discord,
    Telegram,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Telegram => "telegram",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an outbound message is delivered.
#[derive(Debug, Clone)]
pub enum Destination {
    /// A Discord webhook, addressed by its full execute URL.
    DiscordWebhook { url: String },
    /// A Telegram chat reached through the given bot.
    TelegramChat {
        bot_token: SecretString,
        chat_id: String,
    },
}

/// A channel-agnostic message built from one post. Lives for one send.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub content: String,
    pub destination: Destination,
}

impl OutboundMessage {
    pub fn discord(content: impl Into<String>, webhook_url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            destination: Destination::DiscordWebhook {
                url: webhook_url.into(),
            },
        }
    }

    pub fn telegram(
        content: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            destination: Destination::TelegramChat {
                bot_token: SecretString::from(bot_token.into()),
                chat_id: chat_id.into(),
            },
        }
    }
}

/// Normalized outcome of one provider call.
///
/// Built through [`ChannelResult::success`] and [`ChannelResult::failure`]:
/// a successful result always has a non-empty `provider_message_id`, a failed
/// one always has a non-empty `error_message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelResult {
    pub ok: bool,
    pub provider_message_id: String,
    pub provider_channel_id: Option<String>,
    pub provider_webhook_id: Option<String>,
    /// Upstream HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Upstream body: JSON when parseable, else the text, `null` if none.
    pub raw: serde_json::Value,
    pub error_message: Option<String>,
}

impl ChannelResult {
    /// A successful send. An empty message id is downgraded to a failure.
    pub fn success(message_id: impl Into<String>) -> Self {
        let message_id = message_id.into();
        if message_id.trim().is_empty() {
            return Self::failure("");
        }
        Self {
            ok: true,
            provider_message_id: message_id,
            provider_channel_id: None,
            provider_webhook_id: None,
            status: None,
            raw: serde_json::Value::Null,
            error_message: None,
        }
    }

    /// A failed send. An empty message is replaced with a generic description.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "send failed: provider returned no message id".to_string()
        } else {
            message
        };
        Self {
            ok: false,
            provider_message_id: String::new(),
            provider_channel_id: None,
            provider_webhook_id: None,
            status: None,
            raw: serde_json::Value::Null,
            error_message: Some(message),
        }
    }

    pub fn with_channel_id(mut self, id: impl Into<String>) -> Self {
        self.provider_channel_id = Some(id.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn with_webhook_id(mut self, id: impl Into<String>) -> Self {
        self.provider_webhook_id = Some(id.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    /// The failure message, empty on success.
    pub fn error(&self) -> &str {
        self.error_message.as_deref().unwrap_or_default()
    }
}

impl From<ChannelError> for ChannelResult {
    fn from(err: ChannelError) -> Self {
        let message = match err {
            ChannelError::SendFailed { reason, .. } => reason,
            other => other.to_string(),
        };
        Self::failure(message)
    }
}

/// A provider client: turns an [`OutboundMessage`] into one provider call.
///
/// `send` never fails; transport and provider errors come back as a failed
/// [`ChannelResult`].
#[async_trait]
pub trait Channel: Send + Sync {
    /// Which provider this client talks to.
    fn kind(&self) -> ChannelKind;

    /// Resolve where a stored post is delivered on this channel.
    ///
    /// `None` means the post carries no routing metadata for this channel.
    fn destination_for(&self, _post: &Post, _publisher_endpoint: &str) -> Option<Destination> {
        None
    }

    /// Send one message and normalize the provider's answer.
    async fn send(&self, message: &OutboundMessage) -> ChannelResult;
}

/// One client per [`ChannelKind`].
#[derive(Clone)]
pub struct ChannelSet {
    discord: Arc<dyn Channel>,
    telegram: Arc<dyn Channel>,
}

impl ChannelSet {
    /// Build the provider clients sharing one HTTP client with the configured deadline.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChannelError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            discord: Arc::new(DiscordChannel::new(client.clone())),
            telegram: Arc::new(TelegramChannel::new(client, &config.telegram_api_base)),
        })
    }

    pub fn new(discord: Arc<dyn Channel>, telegram: Arc<dyn Channel>) -> Self {
        Self { discord, telegram }
    }

    pub fn get(&self, kind: ChannelKind) -> Arc<dyn Channel> {
        match kind {
            ChannelKind::Discord => Arc::clone(&self.discord),
            ChannelKind::Telegram => Arc::clone(&self.telegram),
        }
    }
}

// ── HTTP helpers shared by the provider clients ─────────────────────

/// Status and body of a provider response.
#[derive(Debug)]
pub(crate) struct ProviderResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ProviderResponse {
    /// The body in the form it is echoed back to callers.
    pub fn raw(&self) -> serde_json::Value {
        raw_body(&self.body)
    }
}

/// POST `body` as JSON and collect the full response.
///
/// Transport errors drop the request URL: it carries bot and webhook tokens.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    kind: ChannelKind,
    request: reqwest::RequestBuilder,
    body: &T,
) -> Result<ProviderResponse, ChannelError> {
    let resp = request
        .json(body)
        .send()
        .await
        .map_err(|e| ChannelError::SendFailed {
            name: kind.to_string(),
            reason: e.without_url().to_string(),
        })?;

    let status = resp.status().as_u16();
    let body = resp.bytes().await.map_err(|e| ChannelError::SendFailed {
        name: kind.to_string(),
        reason: e.without_url().to_string(),
    })?;

    Ok(ProviderResponse {
        status,
        body: body.to_vec(),
    })
}

/// Parsed JSON when the body is JSON, otherwise the lossy text.
pub fn raw_body(body: &[u8]) -> serde_json::Value {
    if body.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Reject content a provider would refuse, before any network call.
pub(crate) fn check_content(
    kind: ChannelKind,
    content: &str,
    max_chars: usize,
) -> Result<(), ChannelError> {
    if content.trim().is_empty() {
        return Err(ChannelError::SendFailed {
            name: kind.to_string(),
            reason: "message content can not be empty".into(),
        });
    }
    if content.chars().count() > max_chars {
        return Err(ChannelError::SendFailed {
            name: kind.to_string(),
            reason: format!("message content exceeds {max_chars} characters"),
        });
    }
    Ok(())
}
