//! Token Compliance Library
//!
//! Compliance checks for fungible tokens on an EVM ledger:
//! - Static bytecode risk analysis (proxy, factory, CALLCODE, entropy)
//! - Holder balance reconstruction from Transfer logs with concentration
//!   anomalies
//! - Persistent holder identities linked to observed balances
//! - A per-token profile with a GO / NO GO / due diligence recommendation

pub mod cli;
pub mod core;
pub mod models;
pub mod providers;
pub mod storage;
pub mod utils;

pub use crate::core::{
    BytecodeAnalyzer, HolderLinker, HolderReconstructor, ProfileAggregator, TransferLedger,
};
pub use models::{
    AnalysisConfig, AppError, AppResult, BytecodeReport, ErrorCode, ErrorTaxonomy,
    HolderSnapshot, LinkPolicy, Recommendation, RpcConfig, TokenProfile,
};
pub use providers::{LedgerProvider, LogQuery, LogRecord, RpcProvider, StaticLedger};
pub use storage::{ComplianceStore, MemoryStore};
pub use utils::BlockRef;
