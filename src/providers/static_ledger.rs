//! Canned in-memory ledger
//!
//! Serves fixed code, logs and call results. Failures and latency can be
//! injected per block range to exercise the chunk recovery paths.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use super::ledger::{LedgerProvider, LogQuery, LogRecord};
use crate::models::errors::{AppError, AppResult, ErrorCode};

/// Failure injected for queries overlapping [from_block, to_block]
struct RangeFailure {
    from_block: u64,
    to_block: u64,
    code: ErrorCode,
    /// `None` fails forever, `Some(n)` fails the next n overlapping queries
    remaining: Option<AtomicU32>,
}

impl RangeFailure {
    fn overlaps(&self, query: &LogQuery) -> bool {
        query.from_block <= self.to_block && query.to_block >= self.from_block
    }

    fn should_fail(&self) -> bool {
        match &self.remaining {
            None => true,
            Some(left) => left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok(),
        }
    }
}

#[derive(Default)]
pub struct StaticLedger {
    head: u64,
    code: HashMap<Address, Bytes>,
    logs: Vec<(Address, LogRecord)>,
    calls: HashMap<(Address, [u8; 4]), Bytes>,
    failures: Vec<RangeFailure>,
    log_delay: Option<Duration>,
    log_queries: AtomicUsize,
}

impl StaticLedger {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            ..Default::default()
        }
    }

    pub fn with_code(mut self, address: Address, code: impl Into<Bytes>) -> Self {
        self.code.insert(address, code.into());
        self
    }

    pub fn with_log(mut self, token: Address, log: LogRecord) -> Self {
        self.logs.push((token, log));
        self
    }

    pub fn with_logs(mut self, token: Address, logs: impl IntoIterator<Item = LogRecord>) -> Self {
        self.logs.extend(logs.into_iter().map(|log| (token, log)));
        self
    }

    /// eth_call answer for calldata starting with `selector`
    pub fn with_call(mut self, to: Address, selector: [u8; 4], result: impl Into<Bytes>) -> Self {
        self.calls.insert((to, selector), result.into());
        self
    }

    /// Every query overlapping the range fails with `code`
    pub fn failing_range(mut self, from_block: u64, to_block: u64, code: ErrorCode) -> Self {
        self.failures.push(RangeFailure {
            from_block,
            to_block,
            code,
            remaining: None,
        });
        self
    }

    /// The next `times` queries overlapping the range fail with `code`
    pub fn flaky_range(mut self, from_block: u64, to_block: u64, code: ErrorCode, times: u32) -> Self {
        self.failures.push(RangeFailure {
            from_block,
            to_block,
            code,
            remaining: Some(AtomicU32::new(times)),
        });
        self
    }

    /// Sleep before answering every log query
    pub fn with_log_delay(mut self, delay: Duration) -> Self {
        self.log_delay = Some(delay);
        self
    }

    /// Number of get_logs calls served so far
    pub fn log_queries(&self) -> usize {
        self.log_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerProvider for StaticLedger {
    async fn block_number(&self) -> AppResult<u64> {
        Ok(self.head)
    }

    async fn get_code(&self, address: Address) -> AppResult<Bytes> {
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }

    async fn get_logs(&self, query: &LogQuery) -> AppResult<Vec<LogRecord>> {
        self.log_queries.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.log_delay {
            tokio::time::sleep(delay).await;
        }

        for failure in &self.failures {
            if failure.overlaps(query) && failure.should_fail() {
                return Err(AppError::new(
                    failure.code,
                    format!("injected failure for {}-{}", query.from_block, query.to_block),
                ));
            }
        }

        let topic = query.topic.to_lowercase();
        let mut matched: Vec<LogRecord> = self
            .logs
            .iter()
            .filter(|(token, _)| *token == query.address)
            .filter(|(_, log)| {
                log.topics
                    .first()
                    .is_some_and(|t0| t0.to_lowercase() == topic)
            })
            .filter(|(_, log)| {
                log.block_number
                    .is_some_and(|b| b >= query.from_block && b <= query.to_block)
            })
            .map(|(_, log)| log.clone())
            .collect();
        matched.sort_by_key(|log| log.block_number);
        Ok(matched)
    }

    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| AppError::rpc_error("calldata shorter than a selector"))?;
        self.calls
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| AppError::rpc_error("execution reverted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::TRANSFER_TOPIC;

    fn query(token: Address, from_block: u64, to_block: u64) -> LogQuery {
        LogQuery {
            address: token,
            topic: TRANSFER_TOPIC.to_string(),
            from_block,
            to_block,
        }
    }

    #[tokio::test]
    async fn test_logs_filtered_by_range_and_token() {
        let token = Address::repeat_byte(0xaa);
        let other = Address::repeat_byte(0xbb);
        let ledger = StaticLedger::new(100)
            .with_log(token, LogRecord::new(vec![TRANSFER_TOPIC.to_string()], "0x", 5))
            .with_log(token, LogRecord::new(vec![TRANSFER_TOPIC.to_string()], "0x", 50))
            .with_log(other, LogRecord::new(vec![TRANSFER_TOPIC.to_string()], "0x", 6));

        let logs = ledger.get_logs(&query(token, 0, 10)).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, Some(5));
        assert_eq!(ledger.log_queries(), 1);
    }

    #[tokio::test]
    async fn test_flaky_range_recovers() {
        let token = Address::repeat_byte(0xaa);
        let ledger = StaticLedger::new(100).flaky_range(0, 10, ErrorCode::RpcTimeout, 1);

        let first = ledger.get_logs(&query(token, 0, 10)).await;
        assert_eq!(first.unwrap_err().code, ErrorCode::RpcTimeout);
        assert!(ledger.get_logs(&query(token, 0, 10)).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_code_is_empty() {
        let ledger = StaticLedger::new(1);
        let code = ledger.get_code(Address::ZERO).await.unwrap();
        assert!(code.is_empty());
    }
}
