//! Discord channel: executes a webhook and reads back the created message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channels::channel::{check_content, post_json};
use crate::channels::{Channel, ChannelKind, ChannelResult, Destination, OutboundMessage};
use crate::error::ChannelError;
use crate::store::Post;

/// Maximum message length for Discord's webhook `content` field.
pub const DISCORD_MAX_CONTENT_LENGTH: usize = 2000;

/// Webhook execute body.
#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    content: &'a str,
}

/// The fields read from a webhook response. Missing fields stay empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookResponse {
    id: String,
    channel_id: String,
    webhook_id: String,
    message: String,
}

/// Discord channel: posts to webhooks given per message.
pub struct DiscordChannel {
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute_webhook(&self, url: &str, content: &str) -> Result<ChannelResult, ChannelError> {
        check_content(ChannelKind::Discord, content, DISCORD_MAX_CONTENT_LENGTH)?;

        // `wait=true` makes Discord answer with the created message instead of 204.
        let request = self.client.post(url).query(&[("wait", "true")]);
        let response = post_json(ChannelKind::Discord, request, &WebhookRequest { content }).await?;

        let parsed: WebhookResponse = serde_json::from_slice(&response.body).unwrap_or_default();

        let result = if parsed.id.is_empty() {
            ChannelResult::failure(parsed.message)
        } else {
            ChannelResult::success(parsed.id)
                .with_channel_id(parsed.channel_id)
                .with_webhook_id(parsed.webhook_id)
        };

        Ok(result.with_status(response.status).with_raw(response.raw()))
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    fn destination_for(&self, post: &Post, publisher_endpoint: &str) -> Option<Destination> {
        post.discord_webhook_url(publisher_endpoint)
            .map(|url| Destination::DiscordWebhook { url })
    }

    async fn send(&self, message: &OutboundMessage) -> ChannelResult {
        let Destination::DiscordWebhook { url } = &message.destination else {
            return ChannelError::InvalidDestination {
                name: "discord".into(),
                reason: "expected a webhook URL".into(),
            }
            .into();
        };

        let result = self
            .execute_webhook(url, &message.content)
            .await
            .unwrap_or_else(ChannelResult::from);

        if result.ok {
            debug!(message_id = %result.provider_message_id, "Discord webhook message created");
        } else {
            warn!(status = ?result.status, error = result.error(), "Discord webhook send failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn channel() -> DiscordChannel {
        DiscordChannel::new(reqwest::Client::new())
    }

    fn webhook(server: &MockServer) -> String {
        format!("{}/webhooks/w1/tok", server.uri())
    }

    #[test]
    fn discord_channel_kind() {
        assert_eq!(channel().kind(), ChannelKind::Discord);
    }

    #[tokio::test]
    async fn created_message_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks/w1/tok"))
            .and(query_param("wait", "true"))
            .and(body_json(serde_json::json!({"content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "123",
                "channel_id": "c1",
                "webhook_id": "w1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = channel()
            .send(&OutboundMessage::discord("hello", webhook(&server)))
            .await;

        assert!(result.ok);
        assert_eq!(result.provider_message_id, "123");
        assert_eq!(result.provider_channel_id.as_deref(), Some("c1"));
        assert_eq!(result.provider_webhook_id.as_deref(), Some("w1"));
        assert_eq!(result.status, Some(200));
        assert_eq!(result.raw["id"], "123");
    }

    #[tokio::test]
    async fn missing_id_is_failure_with_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "bad request", "code": 50006})),
            )
            .mount(&server)
            .await;

        let result = channel()
            .send(&OutboundMessage::discord("hello", webhook(&server)))
            .await;

        assert!(!result.ok);
        assert_eq!(result.error(), "bad request");
        assert_eq!(result.status, Some(400));
        assert_eq!(result.raw["code"], 50006);
    }

    #[tokio::test]
    async fn malformed_body_is_failure_with_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = channel()
            .send(&OutboundMessage::discord("hello", webhook(&server)))
            .await;

        assert!(!result.ok);
        assert!(!result.error().is_empty());
        assert_eq!(result.raw, serde_json::json!("not json"));
    }

    #[tokio::test]
    async fn transport_failure_has_no_status() {
        // Nothing listens on port 9 of localhost.
        let result = channel()
            .send(&OutboundMessage::discord("hello", "http://127.0.0.1:9/webhooks/w1/tok"))
            .await;

        assert!(!result.ok);
        assert_eq!(result.status, None);
        assert_eq!(result.raw, serde_json::Value::Null);
        assert!(!result.error().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_hides_webhook_token() {
        let result = channel()
            .send(&OutboundMessage::discord(
                "hello",
                "http://127.0.0.1:9/webhooks/w1/WEBHOOKSECRET",
            ))
            .await;

        assert!(!result.ok);
        assert!(!result.error().contains("WEBHOOKSECRET"), "{}", result.error());
        assert!(!result.error().contains("/webhooks/"));
    }

    #[tokio::test]
    async fn wrong_destination_makes_no_call() {
        let result = channel()
            .send(&OutboundMessage::telegram("hello", "123:ABC", "42"))
            .await;

        assert!(!result.ok);
        assert!(result.error().contains("webhook URL"));
    }

    #[tokio::test]
    async fn oversized_content_rejected_before_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let content = "a".repeat(DISCORD_MAX_CONTENT_LENGTH + 1);
        let result = channel()
            .send(&OutboundMessage::discord(content, webhook(&server)))
            .await;

        assert!(!result.ok);
        assert!(result.error().contains("2000"));
    }
}
