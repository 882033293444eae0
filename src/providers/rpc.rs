//! JSON-RPC Ledger Provider
//!
//! 1. Primary URL with optional public fallback
//! 2. Exponential backoff retry with jitter on retryable failures
//! 3. User-Agent header, gzip compression
//! 4. API keys masked in every log line

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::ledger::{parse_quantity, LedgerProvider, LogQuery, LogRecord};
use crate::models::config::RpcConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{
    BASE_RETRY_MS, DEADLINE_SLACK_MS, MAX_RETRY_MS, RETRY_JITTER_PERCENT,
    USER_AGENT as USER_AGENT_CONST,
};

/// RPC provider with retry logic and fallback support
#[derive(Clone)]
pub struct RpcProvider {
    primary_url: String,
    fallback_url: Option<String>,
    /// Per-request HTTP timeout
    timeout: Duration,
    /// Attempts per endpoint
    max_retries: u32,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
}

impl RpcProvider {
    pub fn new(config: &RpcConfig) -> AppResult<Self> {
        let client = Self::build_client(config.timeout)?;
        Ok(Self {
            primary_url: config.primary_url.clone(),
            fallback_url: config.fallback_url.clone(),
            timeout: config.timeout,
            max_retries: config.max_retries.max(1),
            client,
        })
    }

    /// Provider from `ETH_RPC_URL` / `ALCHEMY_API_KEY`
    pub fn from_env() -> AppResult<Self> {
        let provider = Self::new(&RpcConfig::from_env()?)?;
        info!("✅ Initialized RPC ({})", provider.masked_url());
        Ok(provider)
    }

    fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| AppError::with_source(ErrorCode::ConfigInvalidValue, "Failed to build HTTP client", e))
    }

    /// Execute JSON-RPC call with retry logic and fallback
    pub async fn call_method<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> AppResult<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let primary_err = match self.call_with_retry(&self.primary_url, &payload).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                warn!("⚠️ Primary RPC failed for {}: {}", method, e);
                e
            }
        };

        if !primary_err.is_retryable() && primary_err.code != ErrorCode::RpcError {
            return Err(primary_err);
        }

        if let Some(ref fallback) = self.fallback_url {
            info!("🔄 Trying fallback RPC for {}", method);
            match self.call_with_retry(fallback, &payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!("⚠️ Fallback RPC also failed: {}", e);
                    return Err(AppError::new(
                        ErrorCode::RpcNoEndpoints,
                        format!("All RPC endpoints failed for {}: {}", method, e),
                    ));
                }
            }
        }

        Err(primary_err)
    }

    /// Worst case for one `call_method`: every attempt on every endpoint
    /// timing out, plus the longest jittered backoff between attempts
    pub fn retry_budget(&self) -> Duration {
        let backoff_ms: u64 = (1..self.max_retries).map(max_backoff_ms).sum();
        let per_endpoint = self.timeout * self.max_retries
            + Duration::from_millis(backoff_ms + DEADLINE_SLACK_MS);
        let endpoints = if self.fallback_url.is_some() { 2 } else { 1 };
        per_endpoint * endpoints
    }

    /// Backoff 1s→2s→4s→8s with ±20% jitter, only for retryable errors
    async fn call_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AppResult<T> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                debug!("⏳ Retry {}/{} after {}ms", attempt + 1, self.max_retries, delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match self.execute_call::<T>(url, payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.code == ErrorCode::RpcRateLimited {
                        warn!("⏳ Rate limited, backing off (attempt {}/{})", attempt + 1, self.max_retries);
                    }
                    let retry = e.is_retryable();
                    last_error = Some(e);
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::new(ErrorCode::RpcNoEndpoints, format!("No attempt made after {} retries", self.max_retries))
        }))
    }

    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AppResult<T> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if status == 429 {
            return Err(AppError::rpc_rate_limited());
        }
        if status.is_server_error() {
            return Err(AppError::rpc_connection_failed(format!("HTTP error: {}", status)));
        }
        if !status.is_success() {
            return Err(AppError::rpc_error(format!("HTTP error: {}", status)));
        }

        let json: RpcResponse<T> = response.json().await?;

        if let Some(error) = json.error {
            if error.is_rate_limit() {
                return Err(AppError::rpc_rate_limited());
            }
            return Err(AppError::rpc_error(format!(
                "RPC error: {} (code: {})",
                error.message, error.code
            )));
        }

        json.result
            .ok_or_else(|| AppError::invalid_response("No result in response"))
    }

    /// RPC URL with any path key hidden
    pub fn masked_url(&self) -> String {
        mask_url(&self.primary_url)
    }
}

#[async_trait]
impl LedgerProvider for RpcProvider {
    async fn block_number(&self) -> AppResult<u64> {
        let raw: String = self.call_method("eth_blockNumber", serde_json::json!([])).await?;
        parse_quantity(&raw)
    }

    async fn get_code(&self, address: Address) -> AppResult<Bytes> {
        let params = serde_json::json!([address.to_checksum(None), "latest"]);
        let raw: String = self.call_method("eth_getCode", params).await?;
        decode_hex_bytes(&raw)
    }

    async fn get_logs(&self, query: &LogQuery) -> AppResult<Vec<LogRecord>> {
        let raw: Vec<RpcLog> = self.call_method("eth_getLogs", query.to_params()).await?;
        Ok(raw.into_iter().map(RpcLog::into_record).collect())
    }

    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes> {
        let params = serde_json::json!([
            { "to": to.to_checksum(None), "data": format!("0x{}", hex::encode(&data)) },
            "latest"
        ]);
        let raw: String = self.call_method("eth_call", params).await?;
        decode_hex_bytes(&raw)
    }

    fn call_deadline(&self, requested: Duration) -> Duration {
        requested.max(self.retry_budget())
    }
}

fn capped_backoff_ms(attempt: u32) -> u64 {
    BASE_RETRY_MS
        .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_RETRY_MS)
}

/// Upper bound of `backoff_delay(attempt)`
fn max_backoff_ms(attempt: u32) -> u64 {
    let capped_delay = capped_backoff_ms(attempt);
    (capped_delay + capped_delay * RETRY_JITTER_PERCENT / 100).max(100)
}

/// Exponential delay for `attempt` (1-based) with random jitter
fn backoff_delay(attempt: u32) -> Duration {
    let capped_delay = capped_backoff_ms(attempt);
    let jitter_range = (capped_delay * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 = rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    Duration::from_millis((capped_delay as i64 + jitter).max(100) as u64)
}

fn decode_hex_bytes(raw: &str) -> AppResult<Bytes> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    Ok(Bytes::from(hex::decode(digits)?))
}

fn mask_url(url: &str) -> String {
    if let Some((prefix, _)) = url.split_once("/v2/") {
        return format!("{}/v2/***HIDDEN***", prefix);
    }
    if let Some((prefix, _)) = url.split_once("/v3/") {
        return format!("{}/v3/***HIDDEN***", prefix);
    }
    url.to_string()
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Rate limit: code -32005 or a "rate limit" message
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }
}

/// Log as it comes off the wire
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
    block_number: Option<String>,
}

impl RpcLog {
    fn into_record(self) -> LogRecord {
        LogRecord {
            topics: self.topics,
            data: self.data,
            block_number: self.block_number.and_then(|b| parse_quantity(&b).ok()),
        }
    }
}
