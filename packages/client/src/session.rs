//! WebSocket client session management.

use std::fmt::Display;

use futures_util::{Sink, SinkExt, StreamExt};
use hiroba_shared::protocol::{ClientPayload, ServerFrame};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use super::{
    error::ClientError,
    formatter::MessageFormatter,
    ui::{prompt_for, redisplay_prompt},
};

/// URL of the room endpoint, carrying the user as the session
pub fn chat_url(base_url: &str, room_id: i64, user_id: i64) -> String {
    format!(
        "{}/{}?user_id={}",
        base_url.trim_end_matches('/'),
        room_id,
        user_id
    )
}

/// Map a failed handshake to a client error
fn classify_connect_error(error: tungstenite::Error) -> ClientError {
    match error {
        tungstenite::Error::Http(response) => ClientError::Rejected(response.status().as_u16()),
        other => ClientError::ConnectionError(other.to_string()),
    }
}

/// Send entered lines to the room until input ends or the socket fails.
///
/// Returns `true` when a send failed. When input ends the socket is closed.
async fn forward_input<S>(input_rx: &mut mpsc::UnboundedReceiver<String>, write: &mut S) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(line) = input_rx.recv().await {
        let json = match serde_json::to_string(&ClientPayload { content: line }) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                continue;
            }
        };

        if let Err(e) = write.send(Message::Text(json.into())).await {
            tracing::warn!("Failed to send message: {}", e);
            return true;
        }
    }

    // 入力終了時はサーバーに切断を伝える
    write.close().await.ok();
    false
}

/// Run one websocket session until the user exits or the connection is lost.
///
/// `input_rx` is owned by the caller and outlives the session, so lines typed
/// while reconnecting go to the next session.
pub async fn run_client_session(
    base_url: &str,
    room_id: i64,
    user_id: i64,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let url = chat_url(base_url, room_id, user_id);

    let (ws_stream, _response) = connect_async(&url).await.map_err(classify_connect_error)?;

    tracing::info!("Connected to room {}!", room_id);
    println!(
        "\nYou are user {} in room {}. Type messages and press Enter to send. Press Ctrl+C to exit.\n",
        user_id, room_id
    );

    let (mut write, mut read) = ws_stream.split();

    let own_key = format!("user{}", user_id);
    let prompt = prompt_for(room_id, user_id);

    // Spawn a task to handle incoming frames
    let mut read_task = tokio::spawn(async move {
        let mut connection_error = false;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let formatted = match serde_json::from_str::<ServerFrame>(text.as_str()) {
                        Ok(frame) => MessageFormatter::format_frame(&frame, &own_key),
                        Err(_) => MessageFormatter::format_raw_message(text.as_str()),
                    };
                    print!("{}", formatted);
                    redisplay_prompt(&prompt);
                }
                Ok(Message::Binary(data)) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt(&prompt);
                }
                Ok(Message::Close(frame)) => {
                    match frame {
                        Some(frame) => tracing::info!(
                            "Server closed the connection ({}: {})",
                            u16::from(frame.code),
                            frame.reason.as_str()
                        ),
                        None => tracing::info!("Server closed the connection"),
                    }
                    connection_error = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    connection_error = true;
                    break;
                }
                _ => {}
            }
        }

        connection_error
    });

    // Whichever side finishes first ends the session
    tokio::select! {
        read_result = &mut read_task => {
            if read_result.unwrap_or(false) {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
        }
        write_error = forward_input(input_rx, &mut write) => {
            read_task.abort();
            if write_error {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
        }
    }

    Ok(())
}
