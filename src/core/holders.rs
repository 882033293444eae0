//! Holder Balance Reconstructor
//!
//! Rebuilds per-address balances for one token from its Transfer logs:
//! 1. Resolve the block window (default: head - lookback ..= head)
//! 2. Split it into fixed-size chunks and fetch logs chunk by chunk
//! 3. Replay every decodable log as a (-amount, +amount) delta pair
//! 4. Rank positive balances, compute concentration, tag anomalies
//! 5. Link the top holders to persistent identities (optional)
//!
//! A failing chunk or a malformed log never aborts the run; both end up in
//! the snapshot diagnostics. Only a window where every chunk failed is an
//! error.

use alloy_primitives::{Address, I256, U256};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::core::identity::HolderLinker;
use crate::models::config::AnalysisConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{
    Anomaly, Diagnostic, HolderBalance, HolderSnapshot, MalformedLog, SnapshotStatus,
};
use crate::providers::{LedgerProvider, LogQuery, LogRecord};
use crate::utils::constants::TRANSFER_TOPIC;

/// One decoded Transfer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

/// Net balance deltas produced by replaying a log sequence
#[derive(Debug, Default)]
pub struct TransferLedger {
    /// Every address touched by an applied transfer, including zero/negative nets
    pub deltas: HashMap<Address, I256>,
    pub applied: usize,
    pub skipped: Vec<Diagnostic>,
}

impl TransferLedger {
    /// Sum of all deltas. Zero for any sequence of applied transfers.
    pub fn net_sum(&self) -> I256 {
        self.deltas
            .values()
            .fold(I256::ZERO, |acc, d| acc.saturating_add(*d))
    }

    pub fn balance_of(&self, address: &Address) -> I256 {
        self.deltas.get(address).copied().unwrap_or(I256::ZERO)
    }

    /// Strictly positive balances, descending, ties by address ascending
    pub fn ranked_holders(&self) -> Vec<HolderBalance> {
        let mut holders: Vec<HolderBalance> = self
            .deltas
            .iter()
            .filter(|(_, delta)| delta.is_positive())
            .map(|(address, delta)| HolderBalance {
                address: *address,
                balance: delta.into_raw(),
            })
            .collect();
        holders.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then_with(|| a.address.cmp(&b.address))
        });
        holders
    }

    fn apply(&mut self, transfer: Transfer) -> Result<(), MalformedLog> {
        let amount = I256::try_from(transfer.amount).map_err(|_| MalformedLog::AmountOverflow)?;

        if transfer.from == transfer.to {
            self.deltas.entry(transfer.from).or_insert(I256::ZERO);
            self.applied += 1;
            return Ok(());
        }

        let from_next = self
            .balance_of(&transfer.from)
            .checked_sub(amount)
            .ok_or(MalformedLog::AmountOverflow)?;
        let to_next = self
            .balance_of(&transfer.to)
            .checked_add(amount)
            .ok_or(MalformedLog::AmountOverflow)?;

        self.deltas.insert(transfer.from, from_next);
        self.deltas.insert(transfer.to, to_next);
        self.applied += 1;
        Ok(())
    }
}

/// Replay logs in order. Undecodable logs are skipped and reported.
pub fn replay_transfers(logs: &[LogRecord]) -> TransferLedger {
    let mut ledger = TransferLedger::default();
    for log in logs {
        let outcome = decode_transfer(log).and_then(|transfer| ledger.apply(transfer));
        if let Err(reason) = outcome {
            debug!("Skipping log at block {:?}: {}", log.block_number, reason);
            ledger.skipped.push(Diagnostic::LogSkipped {
                block_number: log.block_number,
                reason,
            });
        }
    }
    ledger
}

/// Decode sender, recipient and amount from a Transfer log
pub fn decode_transfer(log: &LogRecord) -> Result<Transfer, MalformedLog> {
    if log.topics.len() < 3 {
        return Err(MalformedLog::MissingTopics {
            found: log.topics.len(),
        });
    }
    let from = topic_address(&log.topics[1]).ok_or(MalformedLog::BadTopic { index: 1 })?;
    let to = topic_address(&log.topics[2]).ok_or(MalformedLog::BadTopic { index: 2 })?;

    let data = strip_hex_prefix(&log.data);
    if data.is_empty() {
        return Err(MalformedLog::EmptyData);
    }
    let bytes = hex::decode(data).map_err(|_| MalformedLog::BadData)?;
    // Non-standard emitters may append words; the amount is the first one
    let word = &bytes[..bytes.len().min(32)];

    Ok(Transfer {
        from,
        to,
        amount: U256::from_be_slice(word),
    })
}

/// Low 20 bytes of a 32-byte topic word
fn topic_address(topic: &str) -> Option<Address> {
    let bytes = hex::decode(strip_hex_prefix(topic)).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    Some(Address::from_slice(&bytes[12..]))
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Inclusive [from, to] chunks of at most `size` blocks
pub fn plan_chunks(from_block: u64, to_block: u64, size: u64) -> Vec<(u64, u64)> {
    let mut chunks = Vec::new();
    if from_block > to_block || size == 0 {
        return chunks;
    }
    let mut start = from_block;
    loop {
        let end = start.saturating_add(size - 1).min(to_block);
        chunks.push((start, end));
        if end >= to_block {
            break;
        }
        start = end + 1;
    }
    chunks
}

/// Concentration figures over a ranked holder list
#[derive(Debug, Clone, PartialEq)]
pub struct Concentration {
    pub total_supply: U256,
    pub centralization_score: f64,
    pub top_holder_pct: f64,
}

/// `top` is a prefix of `ranked`; percentages are rounded to 2 decimals
pub fn concentration(ranked: &[HolderBalance], top: &[HolderBalance]) -> Concentration {
    let positive_sum = ranked
        .iter()
        .fold(U256::ZERO, |acc, h| acc.saturating_add(h.balance));
    let total_supply = if positive_sum.is_zero() {
        U256::from(1)
    } else {
        positive_sum
    };
    let top_sum = top
        .iter()
        .fold(U256::ZERO, |acc, h| acc.saturating_add(h.balance));

    let total = u256_to_f64(total_supply);
    let pct = |v: U256| round2(u256_to_f64(v) / total * 100.0);

    Concentration {
        total_supply,
        centralization_score: pct(top_sum),
        top_holder_pct: ranked.first().map(|h| pct(h.balance)).unwrap_or(0.0),
    }
}

pub fn detect_anomalies(
    concentration: &Concentration,
    holder_count: usize,
    config: &AnalysisConfig,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    if concentration.centralization_score > config.whale_threshold_pct {
        anomalies.push(Anomaly::WhaleOwned);
    }
    if holder_count <= config.low_distribution_floor {
        anomalies.push(Anomaly::LowDistribution);
    }
    if concentration.top_holder_pct > config.majority_threshold_pct {
        anomalies.push(Anomaly::MajorityOwnedByOneWallet);
    }
    anomalies
}

fn u256_to_f64(v: U256) -> f64 {
    v.as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * 18_446_744_073_709_551_616.0 + limb as f64)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub struct HolderReconstructor {
    provider: Arc<dyn LedgerProvider>,
    config: AnalysisConfig,
    linker: Option<HolderLinker>,
}

impl HolderReconstructor {
    pub fn new(provider: Arc<dyn LedgerProvider>, config: AnalysisConfig) -> Self {
        Self {
            provider,
            config,
            linker: None,
        }
    }

    /// Link every reported top holder after reconstruction
    pub fn with_linker(mut self, linker: HolderLinker) -> Self {
        self.linker = Some(linker);
        self
    }

    /// Reconstruct balances over [from_block, to_block]. Missing bounds
    /// default to head - lookback and head; `top_n` defaults to config.
    pub async fn reconstruct_holders(
        &self,
        token: Address,
        from_block: Option<u64>,
        to_block: Option<u64>,
        top_n: Option<usize>,
    ) -> AppResult<HolderSnapshot> {
        let start = Instant::now();
        let top_n = top_n.unwrap_or(self.config.default_top_n);

        let (from_block, to_block) = match (from_block, to_block) {
            (Some(from), Some(to)) => (from, to),
            (from, to) => {
                let head = timeout(self.call_deadline(), self.provider.block_number()).await??;
                (
                    from.unwrap_or_else(|| head.saturating_sub(self.config.lookback_blocks)),
                    to.unwrap_or(head),
                )
            }
        };

        let chunks = plan_chunks(from_block, to_block, self.config.chunk_size);
        let chunks_total = chunks.len();
        info!(
            "📜 Scanning {} blocks {}-{} in {} chunks",
            token, from_block, to_block, chunks_total
        );

        let results: Vec<Result<Vec<LogRecord>, Diagnostic>> = stream::iter(chunks)
            .map(|(from, to)| self.fetch_chunk(token, from, to))
            .buffered(self.config.max_concurrent_chunks.max(1))
            .collect()
            .await;

        let mut logs = Vec::new();
        let mut diagnostics = Vec::new();
        for result in results {
            match result {
                Ok(chunk_logs) => logs.extend(chunk_logs),
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }
        let chunks_failed = diagnostics.len();

        if chunks_total > 0 && chunks_failed == chunks_total {
            return Err(AppError::new(
                ErrorCode::RpcNoEndpoints,
                format!(
                    "All {} log chunks failed for {} ({}-{})",
                    chunks_total, token, from_block, to_block
                ),
            ));
        }

        if logs.is_empty() {
            info!("📭 No Transfer logs for {} in {}-{}", token, from_block, to_block);
            let mut snapshot = HolderSnapshot::no_transfers(token, from_block, to_block);
            snapshot.chunks_total = chunks_total;
            snapshot.chunks_failed = chunks_failed;
            snapshot.diagnostics = diagnostics;
            return Ok(snapshot);
        }

        let ledger = replay_transfers(&logs);
        if !ledger.skipped.is_empty() {
            warn!("⚠️ {} malformed Transfer logs skipped for {}", ledger.skipped.len(), token);
        }
        diagnostics.extend(ledger.skipped.iter().cloned());

        let ranked = ledger.ranked_holders();
        let top_holders: Vec<HolderBalance> = ranked.iter().take(top_n).cloned().collect();
        let figures = concentration(&ranked, &top_holders);
        let anomalies = detect_anomalies(&figures, ranked.len(), &self.config);

        if let Some(linker) = &self.linker {
            for holder in &top_holders {
                if let Err(e) = linker.link_holder(token, holder.address, holder.balance).await {
                    warn!("⚠️ Linking {} failed: {}", holder.address, e);
                    diagnostics.push(Diagnostic::LinkFailed {
                        address: holder.address,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "👥 {} | holders: {} | centralization: {:.2}% | anomalies: {:?} | {}ms",
            token,
            ranked.len(),
            figures.centralization_score,
            anomalies,
            start.elapsed().as_millis()
        );

        Ok(HolderSnapshot {
            token,
            status: SnapshotStatus::Activity,
            top_holders,
            centralization_score: figures.centralization_score,
            anomalies,
            total_holder_count: ranked.len(),
            total_supply_calculated: figures.total_supply,
            transfer_events: logs.len(),
            scanned_from: from_block,
            scanned_to: to_block,
            chunks_total,
            chunks_failed,
            diagnostics,
        })
    }

    /// Per-call timeout, widened to whatever the provider's own retries need
    fn call_deadline(&self) -> Duration {
        self.provider.call_deadline(self.config.call_timeout)
    }

    /// Fetch one chunk with per-call timeout and bounded retries
    async fn fetch_chunk(
        &self,
        token: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogRecord>, Diagnostic> {
        let query = LogQuery {
            address: token,
            topic: TRANSFER_TOPIC.to_string(),
            from_block,
            to_block,
        };

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let result = match timeout(self.call_deadline(), self.provider.get_logs(&query)).await {
                Ok(result) => result,
                Err(elapsed) => Err(AppError::from(elapsed)),
            };

            match result {
                Ok(logs) => {
                    debug!("Chunk {}-{}: {} logs", from_block, to_block, logs.len());
                    self.pace().await;
                    return Ok(logs);
                }
                Err(e) if e.is_retryable() && attempts <= self.config.chunk_retries => {
                    debug!(
                        "Chunk {}-{} attempt {} failed ({}), retrying",
                        from_block,
                        to_block,
                        attempts,
                        e.code_str()
                    );
                    sleep(self.retry_delay(attempts)).await;
                }
                Err(e) => {
                    warn!(
                        "⚠️ Chunk {}-{} skipped after {} attempts: {}",
                        from_block, to_block, attempts, e
                    );
                    self.pace().await;
                    return Err(Diagnostic::ChunkFailed {
                        from_block,
                        to_block,
                        attempts,
                        code: e.code_str().to_string(),
                        message: e.message,
                    });
                }
            }
        }
    }

    async fn pace(&self) {
        if !self.config.chunk_pacing.is_zero() {
            sleep(self.config.chunk_pacing).await;
        }
    }

    /// Pacing interval doubled per failed attempt
    fn retry_delay(&self, attempt: u32) -> Duration {
        self.config
            .chunk_pacing
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}
