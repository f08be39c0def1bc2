//! HTTP endpoints: Discord batch send, Telegram publish, health.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::channels::{ChannelKind, ChannelSet, OutboundMessage};
use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::envelope;
use crate::error::GatewayError;
use crate::store::PostStore;

const DISCORD_SEND_ROUTE: &str = "/discord/send";
const TELEGRAM_PUBLISH_ROUTE: &str = "/telegram/publish";

const INVALID_FORMAT: &str = "some fields can be in invalid format";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub store: Arc<dyn PostStore>,
    pub channels: ChannelSet,
}

/// `POST /discord/send` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiscordSendRequest {
    posts: Option<Vec<i64>>,
}

/// `POST /telegram/publish` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TelegramPublishRequest {
    message: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramPublishRequest {
    /// Trim every field and reject the request if any ends up empty.
    fn into_message(self) -> Result<OutboundMessage, GatewayError> {
        let message = self.message.trim();
        let bot_token = self.bot_token.trim();
        let chat_id = self.chat_id.trim();

        if message.is_empty() || bot_token.is_empty() || chat_id.is_empty() {
            return Err(GatewayError::Validation(
                "field `bot_token`, `chat_id` and `message` can not be empty".into(),
            ));
        }

        Ok(OutboundMessage::telegram(message, bot_token, chat_id))
    }
}

/// Build the Axum router with the gateway routes.
pub fn gateway_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(DISCORD_SEND_ROUTE, post(discord_send))
        .route(TELEGRAM_PUBLISH_ROUTE, post(telegram_publish))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "synk-gateway"
    }))
}

async fn discord_send(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let publisher_endpoint = match state.config.require_publisher_endpoint() {
        Ok(endpoint) => endpoint.to_string(),
        Err(e) => return envelope::discord_rejected(DISCORD_SEND_ROUTE, &GatewayError::from(e)),
    };

    let request: DiscordSendRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => {
            return envelope::discord_rejected(
                DISCORD_SEND_ROUTE,
                &GatewayError::Validation(INVALID_FORMAT.into()),
            );
        }
    };
    let post_ids = request.posts.unwrap_or_default();

    let dispatcher = Dispatcher::new(
        Arc::clone(&state.store),
        state.channels.get(ChannelKind::Discord),
        publisher_endpoint,
    )
    .with_concurrency(state.config.dispatch_concurrency);

    match dispatcher.dispatch(&post_ids).await {
        Ok(report) => {
            info!(posts = report.len(), failed = report.failed(), "Discord batch sent");
            envelope::discord_sent(&report)
        }
        Err(e) => envelope::discord_rejected(DISCORD_SEND_ROUTE, &e),
    }
}

async fn telegram_publish(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let request: TelegramPublishRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => {
            return envelope::telegram_rejected(
                TELEGRAM_PUBLISH_ROUTE,
                &GatewayError::Validation(INVALID_FORMAT.into()),
            );
        }
    };

    let message = match request.into_message() {
        Ok(message) => message,
        Err(e) => return envelope::telegram_rejected(TELEGRAM_PUBLISH_ROUTE, &e),
    };

    let result = state.channels.get(ChannelKind::Telegram).send(&message).await;
    envelope::telegram_published(TELEGRAM_PUBLISH_ROUTE, result)
}
