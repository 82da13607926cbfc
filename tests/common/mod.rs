//! Shared helpers for the relay integration tests.
#![allow(dead_code)]

use futures::StreamExt;
use price_relay::events::wire::{decode, PriceUpdateFrame, WireMessage};
use price_relay::price_infra::PriceSourceConfig;
use price_relay::RelayConfig;
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const CONTRACT: &str = "0x9b8e6d8b2417116f4ff9bc4e9b9f91a8a7d2f8e5";

/// ABI-encode a `latestRoundData()` return tuple.
pub fn round_data(answer: i128, updated_at: u64) -> String {
    let mut out = String::from("0x");
    out.push_str(&format!("{:064x}", 1u64));
    out.push_str(&"0".repeat(32));
    out.push_str(&format!("{:032x}", answer as u128));
    out.push_str(&format!("{:064x}", updated_at));
    out.push_str(&format!("{:064x}", updated_at));
    out.push_str(&format!("{:064x}", 1u64));
    out
}

/// JSON-RPC node answering `eth_call` with `answer` (8 decimals).
pub async fn oracle_node(answer: i128) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_call" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": round_data(answer, 1_700_000_000),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getCode" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "0x6080604052",
        })))
        .mount(&server)
        .await;
    server
}

/// JSON-RPC node that fails every call with an RPC error.
pub async fn broken_node() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "execution reverted" },
        })))
        .mount(&server)
        .await;
    server
}

pub fn source(rpc_url: &str, network: &str) -> PriceSourceConfig {
    PriceSourceConfig {
        rpc_url: rpc_url.to_string(),
        contract: CONTRACT.to_string(),
        network: network.to_string(),
        label: "Chainlink Oracle".to_string(),
        decimals: 8,
        verify_code: false,
    }
}

/// Loopback config with a fast cadence and the given sources.
pub fn test_config(primary: PriceSourceConfig, fallbacks: Vec<PriceSourceConfig>) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.poll.interval_ms = 200;
    config.poll.source_timeout_ms = 150;
    config.sources.primary = primary;
    config.sources.fallbacks = fallbacks;
    config
}

pub async fn connect(addr: std::net::SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("websocket handshake");
    client
}

/// Next `price_update` frame, failing the test after two seconds.
pub async fn next_frame(client: &mut Client) -> PriceUpdateFrame {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            match decode(&text).expect("valid frame") {
                WireMessage::PriceUpdate(frame) => return frame,
            }
        }
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
