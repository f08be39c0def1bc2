//! Response envelope: the uniform `{resource, post|posts, raw}` contract
//! every endpoint answers with.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use crate::channels::ChannelResult;
use crate::dispatch::DispatchReport;
use crate::error::GatewayError;

/// `resource` header: did the request go through, and if not, why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceHeader {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceHeader {
    pub fn ok() -> Self {
        Self { ok: true, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}

/// `POST /telegram/publish` response body.
#[derive(Debug, Clone, Serialize)]
pub struct TelegramPublishResponse {
    pub resource: ResourceHeader,
    pub post: TelegramPostInfo,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TelegramPostInfo {
    pub message_id: String,
}

/// `POST /discord/send` response body.
#[derive(Debug, Clone, Serialize)]
pub struct DiscordSendResponse {
    pub resource: ResourceHeader,
    pub posts: BTreeMap<i64, DiscordPostEntry>,
}

/// One post's outcome inside a Discord batch.
#[derive(Debug, Clone, Serialize)]
pub struct DiscordPostEntry {
    pub resource: ResourceHeader,
    pub post: DiscordPostInfo,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscordPostInfo {
    pub id: String,
    pub channel_id: String,
    pub webhook_id: String,
}

impl From<&ChannelResult> for DiscordPostEntry {
    fn from(result: &ChannelResult) -> Self {
        let resource = if result.ok {
            ResourceHeader::ok()
        } else {
            ResourceHeader::error(result.error())
        };
        Self {
            resource,
            post: DiscordPostInfo {
                id: result.provider_message_id.clone(),
                channel_id: result.provider_channel_id.clone().unwrap_or_default(),
                webhook_id: result.provider_webhook_id.clone().unwrap_or_default(),
            },
            raw: result.raw.clone(),
        }
    }
}

/// A response body paired with the status it is written with.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope<T> {
    status: StatusCode,
    body: T,
}

impl<T> ResponseEnvelope<T> {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &T {
        &self.body
    }
}

impl<T: Serialize> IntoResponse for ResponseEnvelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn log_error(route: &str, message: &str, status: StatusCode) {
    warn!(route, error = message, status = status.as_u16(), "Request failed");
}

/// Envelope for a single Telegram send, successful or not.
pub fn telegram_published(route: &str, result: ChannelResult) -> ResponseEnvelope<TelegramPublishResponse> {
    if result.ok {
        return ResponseEnvelope {
            status: StatusCode::OK,
            body: TelegramPublishResponse {
                resource: ResourceHeader::ok(),
                post: TelegramPostInfo {
                    message_id: result.provider_message_id,
                },
                raw: result.raw,
            },
        };
    }

    let err = GatewayError::Provider {
        message: result.error().to_string(),
        status: result.status,
    };
    let status = err.status_code();
    let message = err.message();
    log_error(route, &message, status);
    ResponseEnvelope {
        status,
        body: TelegramPublishResponse {
            resource: ResourceHeader::error(message),
            post: TelegramPostInfo::default(),
            raw: result.raw,
        },
    }
}

/// Envelope for a Telegram request rejected before any send.
pub fn telegram_rejected(route: &str, err: &GatewayError) -> ResponseEnvelope<TelegramPublishResponse> {
    let status = err.status_code();
    let message = err.message();
    log_error(route, &message, status);
    ResponseEnvelope {
        status,
        body: TelegramPublishResponse {
            resource: ResourceHeader::error(message),
            post: TelegramPostInfo::default(),
            raw: serde_json::Value::Null,
        },
    }
}

/// Envelope for a dispatched Discord batch.
///
/// The top-level `resource.ok` only says the batch was dispatched; callers
/// inspect each entry for per-post success.
pub fn discord_sent(report: &DispatchReport) -> ResponseEnvelope<DiscordSendResponse> {
    ResponseEnvelope {
        status: StatusCode::OK,
        body: DiscordSendResponse {
            resource: ResourceHeader::ok(),
            posts: report
                .iter()
                .map(|(id, result)| (id, DiscordPostEntry::from(result)))
                .collect(),
        },
    }
}

/// Envelope for a Discord batch rejected before dispatch.
pub fn discord_rejected(route: &str, err: &GatewayError) -> ResponseEnvelope<DiscordSendResponse> {
    let status = err.status_code();
    let message = err.message();
    log_error(route, &message, status);
    ResponseEnvelope {
        status,
        body: DiscordSendResponse {
            resource: ResourceHeader::error(message),
            posts: BTreeMap::new(),
        },
    }
}
