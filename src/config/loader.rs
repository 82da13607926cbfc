use crate::config::RelayConfig;
use crate::error::Result;
use config::{Config, Environment, File};

pub const ENV_PREFIX: &str = "PRICE_RELAY";

impl RelayConfig {
    /// Layered load: defaults, `config/default`, `config/{env}`, then
    /// `PRICE_RELAY_*` variables (`__` separates nesting levels), then the
    /// short endpoint variables.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&RelayConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut relay: RelayConfig = config.try_deserialize()?;
        relay.apply_env_overrides(|key| std::env::var(key).ok());
        relay.validate()?;
        Ok(relay)
    }

    /// Apply `PRIMARY_RPC_URL`, `FALLBACK_RPC_URL` and `PORT`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PRIMARY_RPC_URL") {
            self.sources.primary.rpc_url = url;
        }
        if let Some(url) = lookup("FALLBACK_RPC_URL") {
            if let Some(first) = self.sources.fallbacks.first_mut() {
                first.rpc_url = url;
            }
        }
        match lookup("PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => self.server.port = port,
            Some(Err(e)) => tracing::warn!("Ignoring invalid PORT: {}", e),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::error::Error;

    #[test]
    fn test_defaults_are_valid() {
        let config = RelayConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.poll_interval().as_millis(), 5_000);
        assert_eq!(config.cache_ttl().as_millis(), 30_000);
        assert_eq!(config.reconnect.max_attempts, 10);
        assert_eq!(config.sources.fallbacks.len(), 1);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PRIMARY_RPC_URL", "http://primary.local"),
            ("FALLBACK_RPC_URL", "http://fallback.local"),
            ("PORT", "9001"),
        ]);
        let mut config = RelayConfig::default();
        config.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.sources.primary.rpc_url, "http://primary.local");
        assert_eq!(config.sources.fallbacks[0].rpc_url, "http://fallback.local");
        assert_eq!(config.server.port, 9001);
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut config = RelayConfig::default();
        config.apply_env_overrides(|k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 8090);
    }

    #[test]
    fn test_timeout_must_be_below_interval() {
        let mut config = RelayConfig::default();
        config.poll.source_timeout_ms = config.poll.interval_ms;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = RelayConfig::default();
        config.reconnect.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_survive_layered_build() {
        let config = Config::builder()
            .add_source(Config::try_from(&RelayConfig::default()).unwrap())
            .build()
            .unwrap();
        let relay: RelayConfig = config.try_deserialize().unwrap();
        assert_eq!(relay.sources.primary.network, "Polygon Amoy");
        assert_eq!(relay.feed.token, "ETH");
    }
}
