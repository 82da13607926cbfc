mod common;

use common::{broken_node, connect, eventually, next_frame, oracle_node, source, test_config};
use futures::SinkExt;
use price_relay::RelayService;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn test_subscriber_receives_primary_updates() {
    let primary = oracle_node(250_000_400_000).await;
    let fallback = oracle_node(250_110_000_000).await;
    let config = test_config(
        source(&primary.uri(), "Polygon Amoy"),
        vec![source(&fallback.uri(), "Ethereum Sepolia")],
    );

    let mut service = RelayService::from_config(config).unwrap();
    let addr = service.start().await.unwrap();
    let mut client = connect(addr).await;

    let frame = next_frame(&mut client).await;
    assert_eq!(frame.data.token, "ETH");
    assert_eq!(frame.data.price, 2500.0);
    assert_eq!(frame.data.tier, "primary");
    assert_eq!(frame.data.network, "Polygon Amoy");
    assert_eq!(frame.data.source, "Chainlink Oracle");
    assert_eq!(frame.source_chain, "price-feed");

    let next = next_frame(&mut client).await;
    assert!(frame.timestamp <= next.timestamp);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fallback_serves_when_primary_is_broken() {
    let primary = broken_node().await;
    let fallback = oracle_node(250_110_000_000).await;
    let config = test_config(
        source(&primary.uri(), "Polygon Amoy"),
        vec![source(&fallback.uri(), "Ethereum Sepolia")],
    );

    let mut service = RelayService::from_config(config).unwrap();
    let addr = service.start().await.unwrap();
    let mut client = connect(addr).await;

    let frame = next_frame(&mut client).await;
    assert_eq!(frame.data.tier, "fallback-1");
    assert_eq!(frame.data.network, "Ethereum Sepolia");
    assert_eq!(frame.data.price, 2501.1);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_synthetic_when_every_source_is_down() {
    let primary = broken_node().await;
    let fallback = broken_node().await;
    let config = test_config(
        source(&primary.uri(), "Polygon Amoy"),
        vec![source(&fallback.uri(), "Ethereum Sepolia")],
    );

    let mut service = RelayService::from_config(config).unwrap();
    let addr = service.start().await.unwrap();
    let mut client = connect(addr).await;

    let frame = next_frame(&mut client).await;
    assert_eq!(frame.data.tier, "synthetic");
    assert_eq!(frame.latency, 0);
    assert!((2450.0..=2550.0).contains(&frame.data.price));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_late_subscriber_gets_replay_with_same_id() {
    let primary = oracle_node(250_000_400_000).await;
    let config = test_config(source(&primary.uri(), "Polygon Amoy"), vec![]);

    let mut service = RelayService::from_config(config).unwrap();
    let hub = service.hub();
    let addr = service.start().await.unwrap();

    assert!(eventually(|| hub.last_update().is_some()).await);
    let mut late = connect(addr).await;
    let replay = next_frame(&mut late).await;

    // The replay is either the update seen above or a newer one; it is
    // always a published update and reports zero latency.
    assert_eq!(replay.latency, 0);
    let next = next_frame(&mut late).await;
    assert_ne!(next.id, replay.id);
    assert!(replay.timestamp <= next.timestamp);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_releases_session() {
    let primary = oracle_node(250_000_400_000).await;
    let config = test_config(source(&primary.uri(), "Polygon Amoy"), vec![]);

    let mut service = RelayService::from_config(config).unwrap();
    let hub = service.hub();
    let addr = service.start().await.unwrap();

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    assert!(eventually(|| hub.subscriber_count() == 2).await);

    a.send(Message::Close(None)).await.unwrap();
    drop(a);
    assert!(eventually(|| hub.subscriber_count() == 1).await);

    // The remaining subscriber keeps receiving
    next_frame(&mut b).await;

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_health_and_status_over_http() {
    let primary = oracle_node(250_000_400_000).await;
    let config = test_config(source(&primary.uri(), "Polygon Amoy"), vec![]);

    let mut service = RelayService::from_config(config).unwrap();
    let hub = service.hub();
    let addr = service.start().await.unwrap();
    assert!(eventually(|| hub.last_update().is_some()).await);

    let health = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);

    let status: serde_json::Value = reqwest::get(format!("http://{}/status", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["connected"], true);
    assert_eq!(status["token"], "ETH");
    assert_eq!(status["lastTier"], "primary");

    service.shutdown().await.unwrap();
}
