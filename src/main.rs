use anyhow::Context;
use price_relay::observability::metrics::register_metrics;
use price_relay::observability::tracing::init_tracing;
use price_relay::{RelayConfig, RelayService};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let env = std::env::var("PRICE_RELAY_ENV").unwrap_or_else(|_| "development".to_string());
    let config = RelayConfig::load(&env).context("failed to load configuration")?;

    let json_logs = config.log.json
        || std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    init_tracing(json_logs);
    register_metrics();

    info!("Starting Chainlink price relay ({})", env);
    info!(
        "Monitoring {}/USD on {}: {}",
        config.feed.token, config.sources.primary.network, config.sources.primary.contract
    );

    let mut service = RelayService::from_config(config).context("failed to build relay service")?;
    service.start().await.context("failed to start relay service")?;

    shutdown_signal().await;
    service.shutdown().await.context("unclean shutdown")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
