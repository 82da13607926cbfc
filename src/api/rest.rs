use axum::{
    Router,
    routing::get,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::api::ApiState;
use crate::api::websocket::websocket_handler;
use crate::observability::metrics::gather_text;

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<ApiState>>) -> (StatusCode, &'static str) {
    if state.connection.borrow().is_terminal() {
        (StatusCode::SERVICE_UNAVAILABLE, "reconnect attempts exhausted")
    } else if state.connection.has_changed().is_err() {
        (StatusCode::SERVICE_UNAVAILABLE, "poll loop stopped")
    } else {
        (StatusCode::OK, "OK")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    connected: bool,
    state: &'static str,
    attempt: u32,
    token: String,
    last_price: Option<f64>,
    last_tier: Option<String>,
    last_update_at: Option<u64>,
    network: String,
    source: String,
    contract: String,
    subscribers: usize,
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let connection = *state.connection.borrow();
    let last = state.hub.last_update();

    Json(StatusResponse {
        connected: connection.is_connected(),
        state: connection.label(),
        attempt: connection.attempt(),
        token: state.feed.token.clone(),
        last_price: last.as_ref().map(|u| u.price.to_display()),
        last_tier: last.as_ref().map(|u| u.tier.label()),
        last_update_at: last.as_ref().map(|u| u.timestamp.as_millis()),
        network: last
            .as_ref()
            .map(|u| u.network_label.clone())
            .unwrap_or_else(|| state.feed.network_label.clone()),
        source: state.feed.source_label.clone(),
        contract: state.feed.contract.clone(),
        subscribers: state.hub.subscriber_count(),
    })
}

async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_text(),
    )
}
