//! Local admin terminal: a static page plus a raw command/response log on disk.
//!
//! Commands typed into the page are appended as JSON lines to the commands
//! file; whatever writes `{"messages": [...]}` into the responses file shows
//! up on the page.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use relay_core::config::AdminConfig;

static ADMIN_HTML: &str = include_str!("../../static/admin.html");

const EMPTY_RESPONSES: &str = r#"{"messages":[]}"#;
const RESET_COMMAND: &str = "/reset";

pub struct AdminState {
    pub commands_file: PathBuf,
    pub responses_file: PathBuf,
}

impl AdminState {
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            commands_file: PathBuf::from(&config.commands_file),
            responses_file: PathBuf::from(&config.responses_file),
        }
    }
}

/// Assemble the admin router.
pub fn build_router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/", get(ui_handler))
        .route("/command", post(command_handler))
        .route("/responses.json", get(responses_handler))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Endpoint not found") })
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Serve the embedded terminal page at `GET /`.
async fn ui_handler() -> Html<&'static str> {
    Html(ADMIN_HTML)
}

/// POST /command: log the command and acknowledge it.
async fn command_handler(State(state): State<Arc<AdminState>>, body: Bytes) -> Json<Value> {
    let payload: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "admin command rejected");
                return reply("Error: Invalid JSON payload.".to_string());
            }
        }
    };

    let command = payload
        .get("command")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match record(&state, &command).await {
        Ok(text) => {
            info!(command = %command, "admin command recorded");
            reply(text)
        }
        Err(e) => {
            warn!(error = %e, "admin command failed");
            reply(format!("Error processing command: {e}"))
        }
    }
}

async fn record(state: &AdminState, command: &str) -> std::io::Result<String> {
    let timestamp = Utc::now().timestamp_millis() as f64 / 1000.0;
    let mut line = json!({ "command": command, "timestamp": timestamp }).to_string();
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&state.commands_file)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;

    if command == RESET_COMMAND {
        tokio::fs::write(&state.responses_file, EMPTY_RESPONSES).await?;
        return Ok("Terminal reset.".to_string());
    }

    Ok(format!(
        "Acknowledged command \u{2192} {command}. Waiting for LLM response..."
    ))
}

fn reply(text: String) -> Json<Value> {
    Json(json!({ "response": text }))
}

/// GET /responses.json: the responses file, created empty when missing.
async fn responses_handler(State(state): State<Arc<AdminState>>) -> Response {
    let content = match tokio::fs::read_to_string(&state.responses_file).await {
        Ok(c) => Ok(c),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tokio::fs::write(&state.responses_file, EMPTY_RESPONSES)
                .await
                .map(|_| EMPTY_RESPONSES.to_string())
        }
        Err(e) => Err(e),
    };

    match content {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            warn!(error = %e, path = %state.responses_file.display(), "responses file unreadable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error reading responses.json: {e}"),
            )
                .into_response()
        }
    }
}
