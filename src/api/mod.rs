pub mod rest;
pub mod websocket;

use std::sync::Arc;
use tokio::sync::watch;
use crate::broadcast::BroadcastHub;
use crate::core::state_machine::ConnectionState;

/// Static description of the feed, reported by `/status`.
#[derive(Clone, Debug)]
pub struct FeedInfo {
    pub token: String,
    pub source_label: String,
    pub network_label: String,
    pub contract: String,
}

pub struct ApiState {
    pub hub: Arc<BroadcastHub>,
    /// Closed once the poll loop that owns the sender is gone.
    pub connection: watch::Receiver<ConnectionState>,
    pub feed: FeedInfo,
}
