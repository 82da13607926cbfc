use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};
use crate::api::ApiState;
use crate::broadcast::Subscription;
use crate::events::wire;
use crate::observability::tracing::trace_session;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ApiState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let subscription = state.hub.subscribe();
    let span = trace_session(&subscription.session_id());
    run_session(socket, subscription).instrument(span).await
}

/// Bridge one hub subscription to one socket until either side goes away.
///
/// The subscription is dropped on every exit path, which unregisters the
/// session from the hub.
async fn run_session(socket: WebSocket, mut subscription: Subscription) {
    let session_id = subscription.session_id();
    let (mut sender, mut receiver) = socket.split();
    info!("Client connected to real-time data stream");

    // Spawn task to send updates to client
    let mut send_task = tokio::spawn(async move {
        while let Some(update) = subscription.recv().await {
            let frame = match wire::encode(&update) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Failed to encode update {}: {}", update.id, e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(frame)).await {
                debug!("Send failed: {}", e);
                break;
            }
        }
        drop(subscription);
    }.in_current_span());

    // Handle incoming messages from client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => debug!("Received: {}", text),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
            }
        }
    }.in_current_span());

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!(session_id = %session_id, "Client disconnected");
}
