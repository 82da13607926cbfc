use tracing::Span;
use tracing_subscriber::{fmt, EnvFilter};
use crate::types::ids::SessionId;

/// Install the global subscriber. `RUST_LOG` controls filtering.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,price_relay=debug"));

    let result = if json {
        fmt().json().with_env_filter(filter).with_target(true).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    if let Err(e) = result {
        tracing::debug!("Tracing already initialised: {}", e);
    }
}

pub fn trace_poll_cycle(cycle: u64) -> Span {
    tracing::info_span!(
        "poll_cycle",
        cycle = cycle,
    )
}

pub fn trace_session(session_id: &SessionId) -> Span {
    tracing::info_span!(
        "subscriber_session",
        session_id = %session_id,
    )
}
