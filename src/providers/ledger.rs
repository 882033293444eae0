//! Ledger Data Provider interface
//!
//! The engines never talk to a node directly. They receive an
//! `Arc<dyn LedgerProvider>`, so tests and offline replays can swap in
//! `StaticLedger`.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::errors::{AppError, AppResult};

/// Raw log record as returned by eth_getLogs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// 32-byte hex words, 0x-prefixed
    pub topics: Vec<String>,
    /// Hex-encoded payload, 0x-prefixed
    pub data: String,
    pub block_number: Option<u64>,
}

impl LogRecord {
    pub fn new(topics: Vec<String>, data: impl Into<String>, block_number: u64) -> Self {
        Self {
            topics,
            data: data.into(),
            block_number: Some(block_number),
        }
    }
}

/// Address + topic0 + inclusive block range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topic: String,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogQuery {
    /// eth_getLogs filter object with hex block quantities
    pub fn to_params(&self) -> serde_json::Value {
        serde_json::json!([{
            "address": self.address.to_checksum(None),
            "topics": [self.topic],
            "fromBlock": to_quantity(self.from_block),
            "toBlock": to_quantity(self.to_block),
        }])
    }
}

/// External node capabilities the engines consume
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    /// Current head block
    async fn block_number(&self) -> AppResult<u64>;

    /// Runtime bytecode at `address`; empty for non-contracts
    async fn get_code(&self, address: Address) -> AppResult<Bytes>;

    /// Logs matching `query`, in ascending block order
    async fn get_logs(&self, query: &LogQuery) -> AppResult<Vec<LogRecord>>;

    /// Read-only call against latest state
    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes>;

    /// Outer deadline for one call when the engine asks for `requested`.
    /// Providers that retry or fail over internally must return at least
    /// their whole retry budget.
    fn call_deadline(&self, requested: Duration) -> Duration {
        requested
    }
}

/// Block number as a JSON-RPC hex quantity
pub fn to_quantity(n: u64) -> String {
    format!("0x{:x}", n)
}

/// Parse a JSON-RPC hex quantity ("0x1a")
pub fn parse_quantity(raw: &str) -> AppResult<u64> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| AppError::invalid_response(format!("Not a hex quantity: {}", raw)))?;
    if digits.is_empty() {
        return Err(AppError::invalid_response("Empty hex quantity"));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|_| AppError::invalid_response(format!("Invalid hex quantity: {}", raw)))
}
