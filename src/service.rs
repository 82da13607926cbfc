use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use crate::api::rest::create_router;
use crate::api::{ApiState, FeedInfo};
use crate::broadcast::BroadcastHub;
use crate::config::RelayConfig;
use crate::core::poll_loop::PollLoop;
use crate::core::reconnect::{LinearBackoff, ReconnectSupervisor};
use crate::core::state_machine::ConnectionState;
use crate::error::{Error, Result};
use crate::price_infra::cache::FreshnessCache;
use crate::price_infra::fallback::{FallbackChain, SourceSlot, SyntheticConfig};
use crate::price_infra::sources::ChainlinkRpcSource;
use crate::types::price::Price;
use crate::utils::task_supervisor::TaskSupervisor;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// One relay instance: poll loop, hub and HTTP/WebSocket server.
///
/// Instances share nothing but metric handles, so several can run in one
/// process.
pub struct RelayService {
    config: RelayConfig,
    hub: Arc<BroadcastHub>,
    feed: FeedInfo,
    poll_loop: Option<PollLoop>,
    connection: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    tasks: TaskSupervisor,
}

impl RelayService {
    /// Build an instance around an already assembled fallback chain.
    pub fn new(config: RelayConfig, chain: FallbackChain) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.hub.subscriber_buffer));
        let (source_label, network_label) = chain.primary_labels();
        let feed = FeedInfo {
            token: config.feed.token.clone(),
            source_label: source_label.to_string(),
            network_label: network_label.to_string(),
            contract: config.sources.primary.contract.clone(),
        };

        let supervisor = ReconnectSupervisor::new(LinearBackoff::new(
            config.backoff_base_delay(),
            config.reconnect.max_attempts,
        ));
        let poll_loop = PollLoop::new(
            Arc::new(chain),
            FreshnessCache::new(config.cache_ttl()),
            Arc::clone(&hub),
            supervisor,
            config.feed.token.clone(),
            config.poll_interval(),
        );
        let connection = poll_loop.state_watch();
        let (shutdown_tx, _) = watch::channel(false);

        RelayService {
            config,
            hub,
            feed,
            poll_loop: Some(poll_loop),
            connection,
            shutdown_tx,
            tasks: TaskSupervisor::new(),
        }
    }

    /// Build an instance with Chainlink JSON-RPC sources from `config`.
    pub fn from_config(config: RelayConfig) -> Result<Self> {
        let chain = build_chain(&config)?;
        Ok(Self::new(config, chain))
    }

    pub fn hub(&self) -> Arc<BroadcastHub> {
        Arc::clone(&self.hub)
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Bind the listener and spawn the server and poll loop.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let poll_loop = self.poll_loop.take()
            .ok_or_else(|| Error::TaskFailure("relay service already started".to_string()))?;

        let listener = TcpListener::bind(self.config.bind_address()).await?;
        let local_addr = listener.local_addr()?;

        let router = create_router(Arc::new(ApiState {
            hub: Arc::clone(&self.hub),
            connection: self.connection.clone(),
            feed: self.feed.clone(),
        }));

        let mut server_shutdown = self.shutdown_tx.subscribe();
        self.tasks.spawn("http_server", async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.changed().await;
                })
                .await?;
            Ok::<(), Error>(())
        });

        let poll_shutdown = self.shutdown_tx.subscribe();
        self.tasks.spawn("poll_loop", async move {
            let result = poll_loop.run(poll_shutdown).await;
            if let Err(e) = &result {
                error!("Price feed unhealthy, operator intervention required: {}", e);
            }
            result
        });

        info!("WebSocket server running on {}", local_addr);
        Ok(local_addr)
    }

    /// Stop polling, close every session and wait for the tasks to drain.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down price relay");
        self.shutdown_tx.send_replace(true);
        self.hub.close_all();

        match self.tasks.join_all(SHUTDOWN_GRACE).await {
            // Exhaustion was already reported through the health surface
            Err(Error::ReconnectExhausted { .. }) => Ok(()),
            other => other,
        }
    }
}

fn build_chain(config: &RelayConfig) -> Result<FallbackChain> {
    let timeout = config.source_timeout();
    let slot = |source: &crate::price_infra::PriceSourceConfig| -> Result<SourceSlot> {
        let rpc = ChainlinkRpcSource::new(source, timeout)
            .map_err(|e| Error::ConfigError(format!("source '{}': {}", source.network, e)))?;
        Ok(SourceSlot::new(source.label.clone(), source.network.clone(), Box::new(rpc)))
    };

    let mut chain = FallbackChain::new(slot(&config.sources.primary)?, timeout)
        .with_synthetic(SyntheticConfig {
            baseline: Price::from_f64(config.feed.synthetic_baseline),
            jitter: Price::from_f64(config.feed.synthetic_jitter),
            ..SyntheticConfig::default()
        });

    for fallback in &config.sources.fallbacks {
        chain = chain.with_fallback(slot(fallback)?);
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_builds_all_sources() {
        let service = RelayService::from_config(RelayConfig::default()).unwrap();
        assert_eq!(service.connection_state(), ConnectionState::Starting);
        assert_eq!(service.feed.network_label, "Polygon Amoy");
        assert_eq!(service.hub().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut config = RelayConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.sources.primary.rpc_url = "http://127.0.0.1:9".to_string();
        config.sources.fallbacks.clear();

        let mut service = RelayService::from_config(config).unwrap();
        service.start().await.unwrap();
        assert!(matches!(service.start().await, Err(Error::TaskFailure(_))));
        service.shutdown().await.unwrap();
    }
}
