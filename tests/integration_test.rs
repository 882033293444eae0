//! Integration tests for the token compliance engines

use alloy_primitives::{Address, U256};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use token_compliance::models::types::{Anomaly, BytecodeFlag, SnapshotStatus};
use token_compliance::utils::constants::TRANSFER_TOPIC;
use token_compliance::{
    AnalysisConfig, BytecodeAnalyzer, ComplianceStore, ErrorCode, ErrorTaxonomy, HolderLinker,
    HolderReconstructor, LinkPolicy, LogRecord, MemoryStore, ProfileAggregator, Recommendation,
    StaticLedger,
};

fn token() -> Address {
    Address::from_str("0x00000000000000000000000000000000000000aa").unwrap()
}

fn topic(address: Address) -> String {
    format!("0x{}{}", "00".repeat(12), hex::encode(address))
}

fn transfer(from: Address, to: Address, amount: u64, block: u64) -> LogRecord {
    LogRecord::new(
        vec![TRANSFER_TOPIC.to_string(), topic(from), topic(to)],
        format!("0x{}", hex::encode(U256::from(amount).to_be_bytes::<32>())),
        block,
    )
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        chunk_pacing: Duration::ZERO,
        ..AnalysisConfig::default()
    }
}

/// PUSH4 transfer-selector EQ: looks like a plain token dispatcher
fn token_like_code() -> Vec<u8> {
    vec![0x63, 0xa9, 0x05, 0x9c, 0xbb, 0x14, 0x00]
}

/// Mint from zero to `holders` wallets, the first one taking `whale` units
fn minted_ledger(holders: u8, whale: u64) -> StaticLedger {
    let mut logs = vec![transfer(Address::ZERO, Address::repeat_byte(1), whale, 10)];
    for i in 2..=holders {
        logs.push(transfer(Address::ZERO, Address::repeat_byte(i), 10, 10 + i as u64));
    }
    StaticLedger::new(100_000)
        .with_code(token(), token_like_code())
        .with_logs(token(), logs)
}

#[tokio::test]
async fn test_bytecode_report_for_proxy() {
    let proxy = Address::repeat_byte(0x99);
    let ledger = StaticLedger::new(1).with_code(proxy, vec![0x60, 0x00, 0xf4, 0x00]);
    let report = BytecodeAnalyzer::new(Arc::new(ledger), config())
        .analyze_bytecode(proxy)
        .await
        .unwrap();

    assert_eq!(
        report.flags,
        vec![BytecodeFlag::ProxyDetected, BytecodeFlag::NonstandardTransfer]
    );
    assert_eq!(report.risk_score, 70);
    assert_eq!(report.opcode_trace, vec!["PUSH1", "DELEGATECALL", "STOP"]);
}

#[tokio::test]
async fn test_no_code_is_distinguishable_from_provider_failure() {
    let analyzer = BytecodeAnalyzer::new(Arc::new(StaticLedger::new(1)), config());
    let err = analyzer.analyze_bytecode(token()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ContractNoCode);
    assert_eq!(err.taxonomy(), ErrorTaxonomy::NoCode);

    let ledger = StaticLedger::new(100).failing_range(0, 100, ErrorCode::RpcConnectionFailed);
    let err = HolderReconstructor::new(Arc::new(ledger), config())
        .reconstruct_holders(token(), Some(0), Some(100), None)
        .await
        .unwrap_err();
    assert_eq!(err.taxonomy(), ErrorTaxonomy::Provider);
}

#[tokio::test]
async fn test_snapshot_invariants_hold() {
    let ledger = minted_ledger(60, 1_000);
    let snapshot = HolderReconstructor::new(Arc::new(ledger), config())
        .reconstruct_holders(token(), Some(0), Some(100_000), Some(10))
        .await
        .unwrap();

    assert_eq!(snapshot.status, SnapshotStatus::Activity);
    assert_eq!(snapshot.total_holder_count, 60);
    assert_eq!(snapshot.top_holders.len(), 10);
    assert!(snapshot
        .top_holders
        .windows(2)
        .all(|w| w[0].balance >= w[1].balance));
    assert!(snapshot.top_holders.iter().all(|h| h.balance > U256::ZERO));
    assert!((0.0..=100.0).contains(&snapshot.centralization_score));

    // 1000 + 59 * 10 = 1590 positive supply, top 10 = 1000 + 90
    assert_eq!(snapshot.total_supply_calculated, U256::from(1_590));
    assert_eq!(snapshot.centralization_score, 68.55);
    assert_eq!(snapshot.anomalies, vec![Anomaly::MajorityOwnedByOneWallet]);
}

#[tokio::test]
async fn test_top_n_larger_than_holder_set() {
    let ledger = minted_ledger(3, 50);
    let snapshot = HolderReconstructor::new(Arc::new(ledger), config())
        .reconstruct_holders(token(), Some(0), Some(100_000), Some(25))
        .await
        .unwrap();
    assert_eq!(snapshot.top_holders.len(), 3);
    assert_eq!(snapshot.centralization_score, 100.0);
}

#[tokio::test]
async fn test_holder_linking_is_idempotent_across_runs() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(minted_ledger(5, 100));
    let reconstructor = HolderReconstructor::new(ledger, config())
        .with_linker(HolderLinker::new(store.clone(), LinkPolicy::FirstWins));

    for _ in 0..2 {
        reconstructor
            .reconstruct_holders(token(), Some(0), Some(100_000), None)
            .await
            .unwrap();
    }

    assert_eq!(store.holder_count().await.unwrap(), 5);
    assert_eq!(store.address_count().await.unwrap(), 5);
    assert_eq!(store.link_count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_assess_clean_distributed_token_is_go() {
    let ledger = minted_ledger(200, 10);
    let store = Arc::new(MemoryStore::new());
    let profile = ProfileAggregator::new(Arc::new(ledger), store.clone(), config())
        .assess(token())
        .await
        .unwrap();

    assert_eq!(profile.risk_score, 100);
    assert_eq!(profile.recommendation, Recommendation::Go);
    assert!(profile.flags.is_empty());
    assert!(profile.modules.contains_key("contract"));
    assert!(profile.modules.contains_key("holders"));

    assert_eq!(store.contract_analyses(token()).await.unwrap().len(), 1);
    assert_eq!(store.holder_analyses(token()).await.unwrap().len(), 1);
    assert_eq!(store.get_profile(token()).await.unwrap(), Some(profile));
}

#[tokio::test]
async fn test_assess_concentrated_token_needs_due_diligence() {
    let ledger = minted_ledger(10, 1_000_000);
    let profile = ProfileAggregator::new(Arc::new(ledger), Arc::new(MemoryStore::new()), config())
        .assess(token())
        .await
        .unwrap();

    assert_eq!(profile.recommendation, Recommendation::EnhancedDueDiligence);
    assert!(profile.flags.contains(&"whale_owned".to_string()));
    assert!(profile.flags.contains(&"majority_owned_by_one_wallet".to_string()));
}

#[tokio::test]
async fn test_assess_without_code_is_no_go() {
    let store = Arc::new(MemoryStore::new());
    let profile = ProfileAggregator::new(Arc::new(StaticLedger::new(10)), store.clone(), config())
        .assess(token())
        .await
        .unwrap();

    assert_eq!(profile.recommendation, Recommendation::NoGo);
    assert!(store.contract_analyses(token()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_assess_with_unavailable_logs_caps_at_due_diligence() {
    let ledger = StaticLedger::new(100_000)
        .with_code(token(), token_like_code())
        .failing_range(0, 100_000, ErrorCode::RpcError);
    let profile = ProfileAggregator::new(Arc::new(ledger), Arc::new(MemoryStore::new()), config())
        .assess(token())
        .await
        .unwrap();

    assert_eq!(profile.risk_score, 100);
    assert_eq!(profile.recommendation, Recommendation::EnhancedDueDiligence);
    assert!(!profile.modules.contains_key("holders"));
}
