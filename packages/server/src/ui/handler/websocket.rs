//! WebSocket connection handlers.
//!
//! Admission happens before the upgrade, so a rejected connection gets a plain
//! HTTP status and never sees a frame. Once upgraded, each connection runs two
//! tasks: the receive loop relays chat payloads, the push loop renders group
//! events from the connection's outbox onto the socket.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use hiroba_shared::time::Clock;
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{EventReceiver, RoomId, UserId},
    infrastructure::dto::{conversion::render_event, websocket::ClientPayload},
    ui::state::AppState,
    usecase::{Admission, Connection, ConnectError},
};

/// How long teardown waits for queued frames to be flushed before dropping the socket
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Stand-in session: the signed-in user's id
    pub user_id: Option<i64>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(user_id) = query.user_id else {
        tracing::warn!("Rejected connection to room {}: no session", room_id);
        return Err(StatusCode::UNAUTHORIZED);
    };

    let admission = state
        .lifecycle
        .admit(UserId::new(user_id), RoomId::new(room_id))
        .await
        .map_err(|e| {
            tracing::warn!("Rejected connection to room {}: {}", room_id, e);
            rejection_status(&e)
        })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, admission)))
}

/// HTTP status answered to a connection that is not admitted
fn rejection_status(error: &ConnectError) -> StatusCode {
    match error {
        ConnectError::UnknownUser(_) => StatusCode::UNAUTHORIZED,
        ConnectError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        ConnectError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
        ConnectError::AlreadyConnected { .. } => StatusCode::CONFLICT,
        ConnectError::SetupFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Spawns a task that renders events from `rx` and pushes them to the websocket.
///
/// The loop ends when every sender of the outbox is gone (the connection was
/// unsubscribed) or the socket stops accepting frames; the socket is closed on exit.
fn pusher_loop(
    mut rx: EventReceiver,
    mut sender: SplitSink<WebSocket, Message>,
    room_label: String,
    clock: Arc<dyn Clock>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = render_event(event, &room_label, clock.as_ref());
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        if let Err(e) = sender.close().await {
            tracing::debug!("Socket already closed: {}", e);
        }
    })
}

/// Reads client payloads until the client closes or the socket fails
fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    connection: Connection,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", connection.id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => relay_payload(&state, &connection, text.as_str()).await,
                Message::Close(_) => {
                    tracing::info!(
                        "'{}' requested close on '{}'",
                        connection.member.client_key,
                        connection.id
                    );
                    break;
                }
                // Ping/pong is answered by the websocket layer
                _ => {}
            }
        }
    })
}

async fn relay_payload(state: &AppState, connection: &Connection, text: &str) {
    let payload = match serde_json::from_str::<ClientPayload>(text) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(
                "Dropped malformed payload from '{}': {}",
                connection.member.client_key,
                e
            );
            return;
        }
    };

    if let Err(e) = state.send_message.execute(connection, payload.content).await {
        tracing::error!(
            "Message from '{}' in '{}' was not relayed: {}",
            connection.member.client_key,
            connection.group,
            e
        );
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, admission: Admission) {
    let (mut sender, receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    let guard = match state.lifecycle.accept(admission, tx).await {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!("Connection setup failed: {}", e);
            let close = Message::Close(Some(CloseFrame {
                code: close_code::ERROR,
                reason: "connection setup failed".into(),
            }));
            if let Err(e) = sender.send(close).await {
                tracing::debug!("Failed to send close frame: {}", e);
            }
            return;
        }
    };

    let connection = guard.connection().clone();
    let mut send_task = pusher_loop(rx, sender, connection.room.name.clone(), state.clock.clone());
    let mut recv_task = receive_loop(receiver, state.clone(), connection);

    // 受信側が終わった場合、退出通知を流し切るまで送信側は止めない
    let send_finished = tokio::select! {
        _ = &mut recv_task => false,
        _ = &mut send_task => {
            recv_task.abort();
            true
        }
    };

    guard
        .teardown(async move {
            if send_finished {
                return;
            }
            if tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task)
                .await
                .is_err()
            {
                tracing::warn!("Timed out flushing frames, dropping socket");
                send_task.abort();
            }
        })
        .await;
}
