pub mod chainlink;

use async_trait::async_trait;
use crate::error::FetchError;
use crate::price_infra::Reading;

pub use chainlink::ChainlinkRpcSource;

/// Capability to read the latest answer from one oracle.
///
/// Implementations make exactly one attempt per call; retry and failover
/// belong to `FallbackChain`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self) -> std::result::Result<Reading, FetchError>;
}
