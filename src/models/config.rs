//! Configuration module for the compliance engines
//!
//! Every threshold the analyzers use is a field here; defaults come from
//! utils/constants.rs and can be overridden through `COMPLIANCE_*` env vars.

use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    build_alchemy_url, DEFAULT_CHUNK_PACING_MS, DEFAULT_CHUNK_RETRIES, DEFAULT_CHUNK_SIZE,
    DEFAULT_EDD_BELOW, DEFAULT_ENTROPY_THRESHOLD, DEFAULT_FLAG_PENALTY,
    DEFAULT_LOOKBACK_BLOCKS, DEFAULT_LOW_DISTRIBUTION_FLOOR, DEFAULT_MAJORITY_THRESHOLD_PCT,
    DEFAULT_MAX_CONCURRENT_CHUNKS, DEFAULT_NO_GO_BELOW, DEFAULT_OPCODE_TRACE_LIMIT,
    DEFAULT_RPC_TIMEOUT_SECS, DEFAULT_TOP_N, DEFAULT_WHALE_THRESHOLD_PCT, MAX_RPC_RETRIES,
};

/// What happens when an (address, token) link is observed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkPolicy {
    /// Keep the balance from the first observation
    #[default]
    FirstWins,
    /// Overwrite with the most recent observation
    LatestWins,
}

impl FromStr for LinkPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_wins" | "first" => Ok(Self::FirstWins),
            "latest_wins" | "latest" | "upsert" => Ok(Self::LatestWins),
            other => Err(AppError::invalid_config(format!(
                "Unknown link policy: {}",
                other
            ))),
        }
    }
}

/// Thresholds and scan parameters for bytecode and holder analysis
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    // Bytecode
    /// Entropy (bits/byte) above which code is flagged as obfuscated
    pub entropy_threshold: f64,
    /// Points deducted per raised flag
    pub flag_penalty: u8,
    /// Opcode mnemonics kept in the report
    pub opcode_trace_limit: usize,

    // Holder scan
    /// Blocks scanned back from head when `from_block` is omitted
    pub lookback_blocks: u64,
    /// Blocks per log request
    pub chunk_size: u64,
    /// Courtesy pause after every chunk request
    pub chunk_pacing: Duration,
    /// Deadline for a single provider call. Providers that retry
    /// internally may widen it (`LedgerProvider::call_deadline`).
    pub call_timeout: Duration,
    /// Extra attempts for retryable chunk failures
    pub chunk_retries: u32,
    /// Chunk requests in flight at once
    pub max_concurrent_chunks: usize,
    /// Holders kept in the snapshot when the caller does not say
    pub default_top_n: usize,

    // Anomalies
    pub whale_threshold_pct: f64,
    pub majority_threshold_pct: f64,
    pub low_distribution_floor: usize,

    // Identity
    pub link_policy: LinkPolicy,

    // Recommendation
    pub no_go_below: u8,
    pub edd_below: u8,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            flag_penalty: DEFAULT_FLAG_PENALTY,
            opcode_trace_limit: DEFAULT_OPCODE_TRACE_LIMIT,
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_pacing: Duration::from_millis(DEFAULT_CHUNK_PACING_MS),
            call_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            chunk_retries: DEFAULT_CHUNK_RETRIES,
            max_concurrent_chunks: DEFAULT_MAX_CONCURRENT_CHUNKS,
            default_top_n: DEFAULT_TOP_N,
            whale_threshold_pct: DEFAULT_WHALE_THRESHOLD_PCT,
            majority_threshold_pct: DEFAULT_MAJORITY_THRESHOLD_PCT,
            low_distribution_floor: DEFAULT_LOW_DISTRIBUTION_FLOOR,
            link_policy: LinkPolicy::FirstWins,
            no_go_below: DEFAULT_NO_GO_BELOW,
            edd_below: DEFAULT_EDD_BELOW,
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by `COMPLIANCE_*` environment variables
    pub fn from_env() -> AppResult<Self> {
        let d = Self::default();
        let config = Self {
            entropy_threshold: env_or("COMPLIANCE_ENTROPY_THRESHOLD", d.entropy_threshold)?,
            flag_penalty: env_or("COMPLIANCE_FLAG_PENALTY", d.flag_penalty)?,
            opcode_trace_limit: env_or("COMPLIANCE_OPCODE_TRACE_LIMIT", d.opcode_trace_limit)?,
            lookback_blocks: env_or("COMPLIANCE_LOOKBACK_BLOCKS", d.lookback_blocks)?,
            chunk_size: env_or("COMPLIANCE_CHUNK_SIZE", d.chunk_size)?,
            chunk_pacing: Duration::from_millis(env_or(
                "COMPLIANCE_CHUNK_PACING_MS",
                DEFAULT_CHUNK_PACING_MS,
            )?),
            call_timeout: Duration::from_secs(env_or(
                "COMPLIANCE_CALL_TIMEOUT_SECS",
                DEFAULT_RPC_TIMEOUT_SECS,
            )?),
            chunk_retries: env_or("COMPLIANCE_CHUNK_RETRIES", d.chunk_retries)?,
            max_concurrent_chunks: env_or(
                "COMPLIANCE_MAX_CONCURRENT_CHUNKS",
                d.max_concurrent_chunks,
            )?,
            default_top_n: env_or("COMPLIANCE_TOP_N", d.default_top_n)?,
            whale_threshold_pct: env_or("COMPLIANCE_WHALE_THRESHOLD_PCT", d.whale_threshold_pct)?,
            majority_threshold_pct: env_or(
                "COMPLIANCE_MAJORITY_THRESHOLD_PCT",
                d.majority_threshold_pct,
            )?,
            low_distribution_floor: env_or(
                "COMPLIANCE_LOW_DISTRIBUTION_FLOOR",
                d.low_distribution_floor,
            )?,
            link_policy: env_or("COMPLIANCE_LINK_POLICY", d.link_policy)?,
            no_go_below: env_or("COMPLIANCE_NO_GO_BELOW", d.no_go_below)?,
            edd_below: env_or("COMPLIANCE_EDD_BELOW", d.edd_below)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a scan meaningless or loop forever
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::invalid_config("chunk_size must be > 0"));
        }
        if self.max_concurrent_chunks == 0 {
            return Err(AppError::invalid_config("max_concurrent_chunks must be > 0"));
        }
        if !(0.0..=8.0).contains(&self.entropy_threshold) {
            return Err(AppError::invalid_config("entropy_threshold must be within [0, 8]"));
        }
        for (name, pct) in [
            ("whale_threshold_pct", self.whale_threshold_pct),
            ("majority_threshold_pct", self.majority_threshold_pct),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(AppError::invalid_config(format!(
                    "{} must be within [0, 100]",
                    name
                )));
            }
        }
        if self.no_go_below > self.edd_below || self.edd_below > 100 {
            return Err(AppError::invalid_config(
                "recommendation cutoffs must satisfy no_go_below <= edd_below <= 100",
            ));
        }
        Ok(())
    }
}

/// Ledger node endpoints
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Primary JSON-RPC URL
    pub primary_url: String,
    /// Optional public fallback
    pub fallback_url: Option<String>,
    /// HTTP client timeout
    pub timeout: Duration,
    /// Attempts per endpoint before moving on
    pub max_retries: u32,
}

impl RpcConfig {
    pub fn new(primary_url: impl Into<String>) -> Self {
        Self {
            primary_url: primary_url.into(),
            fallback_url: None,
            timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            max_retries: MAX_RPC_RETRIES,
        }
    }

    /// `ETH_RPC_URL`, else an Alchemy URL built from `ALCHEMY_API_KEY`.
    /// The key itself is never logged.
    pub fn from_env() -> AppResult<Self> {
        let primary_url = match std::env::var("ETH_RPC_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => match std::env::var("ALCHEMY_API_KEY") {
                Ok(key) if !key.is_empty() && key != "YOUR_API_KEY" => {
                    info!("🔑 Using ALCHEMY_API_KEY (key hidden)");
                    build_alchemy_url(&key)
                }
                _ => return Err(AppError::missing_env("ETH_RPC_URL")),
            },
        };

        let fallback_url = std::env::var("ETH_RPC_FALLBACK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty());

        Ok(Self {
            primary_url,
            fallback_url,
            timeout: Duration::from_secs(env_or(
                "COMPLIANCE_CALL_TIMEOUT_SECS",
                DEFAULT_RPC_TIMEOUT_SECS,
            )?),
            max_retries: env_or("COMPLIANCE_RPC_RETRIES", MAX_RPC_RETRIES)?.max(1),
        })
    }

    pub fn with_fallback(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }
}

/// Read and parse an env var, falling back to `default` when unset
fn env_or<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|_| {
            warn!("⚠️ Invalid value for {}: {}", key, raw);
            AppError::invalid_config(format!("Invalid value for {}: {}", key, raw))
        }),
        _ => Ok(default),
    }
}
