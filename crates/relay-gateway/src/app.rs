use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use relay_core::config::{DiscordSettings, RelayConfig};
use relay_discord::DiscordAppContext;
use relay_engine::Relay;
use tokio_util::sync::CancellationToken;

/// Central shared state, passed as Arc<AppState> to all Axum handlers and
/// to the Discord event handler.
pub struct AppState {
    pub config: RelayConfig,
    pub discord: DiscordSettings,
    pub relay: Arc<Relay>,
    /// Root token: cancelling it stops every listener and the gateway.
    pub shutdown: CancellationToken,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        discord: DiscordSettings,
        relay: Arc<Relay>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            discord,
            relay,
            shutdown,
            started_at: Utc::now(),
        }
    }
}

impl DiscordAppContext for AppState {
    fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    fn discord(&self) -> &DiscordSettings {
        &self.discord
    }

    fn request_shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Router for the worker listener.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::ws::connection::ws_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route("/health", get(crate::http::health::health_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
