use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::session::{ServerMessage, SessionOrchestrator};

use super::AppState;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// One connection: a forward task drains the outbound channel into the
/// socket while this task reads and handles messages strictly in order.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let session = SessionOrchestrator::new(
        state.extractor.clone(),
        state.recognizer.clone(),
        &state.settings,
        tx.clone(),
    );
    let session_id = session.id();
    log::info!("WebSocket client connected: {session_id}");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(err) => {
                    log::error!("failed to serialize outbound message: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_loop = async {
        while let Some(result) = receiver.next().await {
            let replies = match result {
                Ok(Message::Text(text)) => session.handle_text(&text).await,
                Ok(Message::Binary(_)) => vec![ServerMessage::error("Binary messages are not supported")],
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    log::warn!("WebSocket error on {session_id}: {err}");
                    break;
                }
            };

            for reply in replies {
                if tx.send(reply).is_err() {
                    return;
                }
            }
        }
    };

    tokio::select! {
        _ = recv_loop => {}
        _ = &mut send_task => {}
    }

    session.close().await;
    send_task.abort();
    log::info!("WebSocket client disconnected: {session_id}");
}
