use std::fmt::Display;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use relay_core::config::MAX_PAYLOAD_BYTES;
use relay_core::RelayError;
use relay_engine::{Connection, Relay};
use tracing::{debug, info, warn};

use crate::app::AppState;

/// Axum handler. Upgrades HTTP to WebSocket at GET / and GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection event loop. Lives for the entire worker session.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let relay = Arc::clone(&state.relay);
    let mut conn = relay.accept();

    let (tx, rx) = socket.split();
    drive(&relay, &mut conn, tx, rx).await;

    relay.on_disconnect(&conn.id);
    info!(conn_id = %conn.id, "worker socket closed");
}

/// What a single received frame asks the loop to do.
#[derive(Debug, PartialEq)]
enum Incoming {
    Event(String),
    Pong(Bytes),
    Close,
    Skip,
}

fn decode(conn_id: &str, msg: Message) -> Incoming {
    match msg {
        Message::Text(text) if oversized(conn_id, text.len()) => Incoming::Skip,
        Message::Text(text) => Incoming::Event(text.as_str().to_owned()),
        Message::Binary(data) if oversized(conn_id, data.len()) => Incoming::Skip,
        Message::Binary(data) => match String::from_utf8(data.to_vec()) {
            Ok(text) => Incoming::Event(text),
            Err(e) => {
                warn!(conn_id, error = %e, "non-UTF-8 frame dropped");
                Incoming::Skip
            }
        },
        Message::Ping(data) => Incoming::Pong(data),
        Message::Close(_) => Incoming::Close,
        Message::Pong(_) => Incoming::Skip,
    }
}

/// Pump frames between the socket halves and the relay until either side
/// goes away or the connection is replaced.
///
/// Frames are handed to the relay one at a time: the next frame is not read
/// until the previous one has been fully processed.
async fn drive<W, R, E>(relay: &Relay, conn: &mut Connection, mut tx: W, mut rx: R)
where
    W: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        tokio::select! {
            biased;

            _ = conn.cancel.cancelled() => {
                debug!(conn_id = %conn.id, "connection cancelled");
                let _ = tx.send(Message::Close(None)).await;
                break;
            }

            frame = conn.outbound.recv() => {
                let Some(frame) = frame else { break };
                if tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            msg = rx.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(conn_id = %conn.id, error = %e, "worker socket error");
                        break;
                    }
                    None => break,
                };
                match decode(&conn.id, msg) {
                    Incoming::Event(text) => relay.on_event(&conn.id, &text).await,
                    Incoming::Pong(data) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Incoming::Close => break,
                    Incoming::Skip => {}
                }
            }
        }
    }
}

fn oversized(conn_id: &str, size: usize) -> bool {
    if size <= MAX_PAYLOAD_BYTES {
        return false;
    }
    let err = RelayError::PayloadTooLarge {
        size,
        max: MAX_PAYLOAD_BYTES,
    };
    warn!(conn_id, code = err.code(), error = %err, "frame dropped");
    true
}
