use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use synk_gateway::channels::ChannelSet;
use synk_gateway::config::GatewayConfig;
use synk_gateway::routes::{AppState, gateway_routes};
use synk_gateway::store::{LibSqlBackend, PostStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = GatewayConfig::from_env().context("Failed to load gateway configuration")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Synk gateway starting");
    match config.publisher_endpoint.as_deref() {
        Some(endpoint) => tracing::info!(publisher = endpoint, "Discord publishing enabled"),
        None => tracing::warn!("PUBLISHER_ENDPOINT not set; /discord/send will answer 500"),
    }

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn PostStore> = Arc::new(
        LibSqlBackend::new_local(Path::new(&config.db_path))
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path))?,
    );

    // ── Channels ─────────────────────────────────────────────────────────
    let channels = ChannelSet::from_config(&config).context("Failed to build channel clients")?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        store,
        channels,
    };
    let app = gateway_routes(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "Gateway listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
