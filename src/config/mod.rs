use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::price_infra::PriceSourceConfig;

pub mod loader;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub poll: PollConfig,
    pub cache: CacheConfig,
    pub reconnect: ReconnectConfig,
    pub feed: FeedConfig,
    pub hub: HubConfig,
    pub sources: SourcesConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Per-source fetch budget; must be below `interval_ms`.
    pub source_timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CacheConfig {
    pub ttl_ms: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReconnectConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeedConfig {
    pub token: String,
    pub synthetic_baseline: f64,
    pub synthetic_jitter: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HubConfig {
    pub subscriber_buffer: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SourcesConfig {
    pub primary: PriceSourceConfig,
    #[serde(default)]
    pub fallbacks: Vec<PriceSourceConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LogConfig {
    pub json: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8090,
            },
            poll: PollConfig {
                interval_ms: 5_000,
                source_timeout_ms: 4_000,
            },
            cache: CacheConfig { ttl_ms: 30_000 },
            reconnect: ReconnectConfig {
                max_attempts: 10,
                base_delay_ms: 5_000,
            },
            feed: FeedConfig {
                token: "ETH".to_string(),
                synthetic_baseline: 2500.0,
                synthetic_jitter: 50.0,
            },
            hub: HubConfig { subscriber_buffer: 64 },
            sources: SourcesConfig {
                // Chainlink ETH/USD on Polygon Amoy
                primary: PriceSourceConfig {
                    rpc_url: "https://rpc-amoy.polygon.technology".to_string(),
                    contract: "0x9b8e6d8b2417116f4ff9bc4e9b9f91a8a7d2f8e5".to_string(),
                    network: "Polygon Amoy".to_string(),
                    label: "Chainlink Oracle".to_string(),
                    decimals: 8,
                    verify_code: true,
                },
                // Chainlink ETH/USD on Ethereum Sepolia
                fallbacks: vec![PriceSourceConfig {
                    rpc_url: "https://ethereum-sepolia.publicnode.com".to_string(),
                    contract: "0x694AA1769357215DE4FAC081bf1f309aDC325306".to_string(),
                    network: "Ethereum Sepolia".to_string(),
                    label: "Chainlink Oracle".to_string(),
                    decimals: 8,
                    verify_code: false,
                }],
            },
            log: LogConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.poll.source_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }

    pub fn backoff_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect.base_delay_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_ms == 0 {
            return Err(Error::ConfigError("poll.interval_ms must be positive".to_string()));
        }
        if self.poll.source_timeout_ms == 0 || self.poll.source_timeout_ms >= self.poll.interval_ms {
            return Err(Error::ConfigError(format!(
                "poll.source_timeout_ms ({}) must be positive and below poll.interval_ms ({})",
                self.poll.source_timeout_ms, self.poll.interval_ms
            )));
        }
        if self.cache.ttl_ms == 0 {
            return Err(Error::ConfigError("cache.ttl_ms must be positive".to_string()));
        }
        if self.reconnect.max_attempts == 0 {
            return Err(Error::ConfigError("reconnect.max_attempts must be positive".to_string()));
        }
        if self.feed.token.trim().is_empty() {
            return Err(Error::ConfigError("feed.token must not be empty".to_string()));
        }
        if !(self.feed.synthetic_baseline > 0.0) {
            return Err(Error::ConfigError("feed.synthetic_baseline must be positive".to_string()));
        }
        if !(self.feed.synthetic_jitter >= 0.0) {
            return Err(Error::ConfigError("feed.synthetic_jitter must not be negative".to_string()));
        }
        if self.hub.subscriber_buffer == 0 {
            return Err(Error::ConfigError("hub.subscriber_buffer must be positive".to_string()));
        }
        for source in std::iter::once(&self.sources.primary).chain(&self.sources.fallbacks) {
            if source.rpc_url.trim().is_empty() || source.contract.trim().is_empty() {
                return Err(Error::ConfigError(format!(
                    "source '{}' needs both rpc_url and contract",
                    source.network
                )));
            }
        }
        Ok(())
    }
}
