use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{error, info, Instrument};
use crate::broadcast::BroadcastHub;
use crate::core::reconnect::{ReconnectSupervisor, RetryDecision};
use crate::core::state_machine::ConnectionState;
use crate::error::{Error, Result};
use crate::events::price::PriceUpdate;
use crate::observability::metrics::POLL_CYCLES;
use crate::observability::tracing::trace_poll_cycle;
use crate::price_infra::cache::FreshnessCache;
use crate::price_infra::fallback::FallbackChain;
use crate::types::timestamp::MonotonicClock;

/// Drives the fallback chain on a fixed cadence and publishes each result.
///
/// Single-flight: a cycle always completes (or fails) before the next tick
/// is awaited, and missed ticks are skipped rather than queued.
pub struct PollLoop {
    chain: Arc<FallbackChain>,
    cache: FreshnessCache,
    hub: Arc<BroadcastHub>,
    supervisor: ReconnectSupervisor,
    clock: MonotonicClock,
    token: String,
    poll_interval: Duration,
    cycle: u64,
}

impl PollLoop {
    pub fn new(
        chain: Arc<FallbackChain>,
        cache: FreshnessCache,
        hub: Arc<BroadcastHub>,
        supervisor: ReconnectSupervisor,
        token: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        PollLoop {
            chain,
            cache,
            hub,
            supervisor,
            clock: MonotonicClock::new(),
            token: token.into(),
            poll_interval,
            cycle: 0,
        }
    }

    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// Run one Fetching step and publish the result.
    ///
    /// The fetch runs on its own task; if that task dies before producing
    /// a price the cycle is a transport failure. Source failures never
    /// surface here.
    pub async fn poll_once(&mut self) -> Result<PriceUpdate> {
        self.cycle += 1;
        POLL_CYCLES.inc();

        let chain = Arc::clone(&self.chain);
        let snapshot = self.cache.clone();
        let fetch = tokio::spawn(
            async move { chain.resolve(&snapshot).await }
                .instrument(trace_poll_cycle(self.cycle)),
        );

        let resolved = fetch
            .await
            .map_err(|e| Error::TransportFailure(format!("poll cycle {} aborted: {}", self.cycle, e)))?;

        if resolved.tier.is_live() {
            self.cache.put(
                resolved.price,
                Instant::now(),
                resolved.source_label.clone(),
                resolved.network_label.clone(),
            );
        }

        let update = PriceUpdate::from_resolved(&self.token, resolved, self.clock.now());
        self.supervisor.on_success();

        let report = self.hub.publish(update.clone());
        info!(
            "{}/USD: ${} via {} [{}] ({} ms latency, {} subscribers)",
            update.token,
            update.price,
            update.network_label,
            update.tier,
            update.latency_millis(),
            report.delivered
        );

        Ok(update)
    }

    /// Poll until shutdown is signalled or reconnect attempts run out.
    ///
    /// The first fetch happens immediately. Returns
    /// `Error::ReconnectExhausted` in the terminal case; the hub keeps its
    /// last update and the state watch reports `Failed`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Starting price poll loop: {} every {} ms across {} source(s)",
            self.token,
            self.poll_interval.as_millis(),
            self.chain.source_count()
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("Poll loop shutting down");
                    return Ok(());
                }
            }

            let mut recovered = false;
            loop {
                match self.poll_once().await {
                    Ok(_) => break,
                    Err(e) => {
                        error!("Error fetching price: {}", e);
                        match self.supervisor.on_failure() {
                            RetryDecision::Retry { delay, .. } => {
                                recovered = true;
                                tokio::select! {
                                    _ = sleep(delay) => {}
                                    _ = shutdown.changed() => {
                                        info!("Poll loop shutting down during backoff");
                                        return Ok(());
                                    }
                                }
                            }
                            RetryDecision::GiveUp { attempts } => {
                                return Err(Error::ReconnectExhausted { attempts });
                            }
                        }
                    }
                }
            }

            if recovered {
                ticker.reset();
            }
        }
    }
}
