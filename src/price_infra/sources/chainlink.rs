use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use crate::error::FetchError;
use crate::price_infra::sources::PriceSource;
use crate::price_infra::{PriceSourceConfig, Reading};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

/// `latestRoundData()` selector of AggregatorV3Interface.
const LATEST_ROUND_DATA: &str = "0xfeaf968c";
const WORD: usize = 32;

/// Reads a Chainlink aggregator over Ethereum JSON-RPC.
pub struct ChainlinkRpcSource {
    client: reqwest::Client,
    rpc_url: String,
    contract: String,
    decimals: u32,
    verify_code: bool,
    request_id: AtomicU64,
}

impl ChainlinkRpcSource {
    pub fn new(config: &PriceSourceConfig, request_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(ChainlinkRpcSource {
            client,
            rpc_url: config.rpc_url.clone(),
            contract: config.contract.to_lowercase(),
            decimals: config.decimals,
            verify_code: config.verify_code,
            request_id: AtomicU64::new(1),
        })
    }

    async fn rpc(&self, method: &str, params: serde_json::Value) -> Result<String, FetchError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self.client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(FetchError::Rpc { code: err.code, message: err.message });
        }

        envelope.result
            .ok_or_else(|| FetchError::Decode(format!("{} returned no result", method)))
    }

    async fn ensure_contract_code(&self) -> Result<(), FetchError> {
        let code = self.rpc("eth_getCode", json!([self.contract, "latest"])).await?;
        if code.trim_start_matches("0x").is_empty() {
            return Err(FetchError::NoContractCode(self.contract.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceSource for ChainlinkRpcSource {
    async fn fetch(&self) -> Result<Reading, FetchError> {
        if self.verify_code {
            self.ensure_contract_code().await?;
        }

        let data = self.rpc(
            "eth_call",
            json!([{ "to": self.contract, "data": LATEST_ROUND_DATA }, "latest"]),
        ).await?;

        decode_round_data(&data, self.decimals)
    }
}

/// Decode the ABI-encoded `(roundId, answer, startedAt, updatedAt, answeredInRound)` tuple.
pub fn decode_round_data(data: &str, decimals: u32) -> Result<Reading, FetchError> {
    let bytes = hex::decode(data.trim_start_matches("0x"))
        .map_err(|e| FetchError::Decode(e.to_string()))?;

    if bytes.len() < 5 * WORD {
        return Err(FetchError::Decode(format!(
            "latestRoundData returned {} bytes, expected {}",
            bytes.len(),
            5 * WORD
        )));
    }

    let answer = decode_int256(word(&bytes, 1))?;
    if answer <= 0 {
        return Err(FetchError::InvalidAnswer(format!("non-positive answer {}", answer)));
    }

    let price = Price::from_scaled(answer, decimals)
        .ok_or_else(|| FetchError::InvalidAnswer(format!("answer {} out of range", answer)))?;
    if !price.is_positive() {
        return Err(FetchError::InvalidAnswer(format!("answer {} rounds to zero", answer)));
    }

    let updated_at_secs = decode_uint64(word(&bytes, 3))?;

    Ok(Reading {
        price,
        updated_at: Timestamp::from_millis(updated_at_secs.saturating_mul(1000)),
    })
}

fn word(bytes: &[u8], index: usize) -> &[u8] {
    &bytes[index * WORD..(index + 1) * WORD]
}

fn decode_int256(word: &[u8]) -> Result<i128, FetchError> {
    let (high, low) = word.split_at(16);
    let mut buf = [0u8; 16];
    buf.copy_from_slice(low);
    let value = i128::from_be_bytes(buf);

    let pad = if value < 0 { 0xff } else { 0x00 };
    if high.iter().any(|&b| b != pad) {
        return Err(FetchError::Decode("int256 answer does not fit in 128 bits".to_string()));
    }
    Ok(value)
}

fn decode_uint64(word: &[u8]) -> Result<u64, FetchError> {
    let (high, low) = word.split_at(24);
    if high.iter().any(|&b| b != 0) {
        return Err(FetchError::Decode("uint256 timestamp does not fit in 64 bits".to_string()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    Ok(u64::from_be_bytes(buf))
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}
