//! Type definitions for the compliance engines
//! Reports, snapshots, identity records and per-run diagnostics

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================
// BYTECODE ANALYSIS
// ============================================

/// Flags raised by the bytecode checks, in check order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BytecodeFlag {
    /// DELEGATECALL present
    ProxyDetected,
    /// CREATE / CREATE2 present
    ContractFactoryDetected,
    /// CALLCODE present
    DeprecatedCallcodeUsed,
    /// transfer(address,uint256) selector missing
    NonstandardTransfer,
    /// Byte entropy above threshold
    ObfuscatedCode,
}

impl BytecodeFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProxyDetected => "proxy_detected",
            Self::ContractFactoryDetected => "contract_factory_detected",
            Self::DeprecatedCallcodeUsed => "deprecated_callcode_used",
            Self::NonstandardTransfer => "nonstandard_transfer",
            Self::ObfuscatedCode => "obfuscated_code",
        }
    }
}

impl fmt::Display for BytecodeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static risk report for one contract. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeReport {
    pub address: Address,
    /// 0-100, higher is safer
    pub risk_score: u8,
    pub flags: Vec<BytecodeFlag>,
    /// One entry per detected condition, in detection order
    pub evidence: Vec<String>,
    /// keccak256 of the runtime code, 0x-prefixed
    pub bytecode_hash: String,
    /// Shannon entropy in bits per byte, 2 decimals
    pub entropy_bits: f64,
    pub matched_function_signatures: Vec<String>,
    /// First N decoded mnemonics
    pub opcode_trace: Vec<String>,
    pub bytecode_size: usize,
}

impl BytecodeReport {
    pub fn has_flag(&self, flag: BytecodeFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Flag names as plain strings
    pub fn flag_names(&self) -> Vec<String> {
        self.flags.iter().map(|f| f.as_str().to_string()).collect()
    }
}

// ============================================
// HOLDER RECONSTRUCTION
// ============================================

/// One ranked holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderBalance {
    pub address: Address,
    pub balance: U256,
}

/// Concentration anomalies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    WhaleOwned,
    LowDistribution,
    MajorityOwnedByOneWallet,
}

impl Anomaly {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhaleOwned => "whale_owned",
            Self::LowDistribution => "low_distribution",
            Self::MajorityOwnedByOneWallet => "majority_owned_by_one_wallet",
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the scanned window saw any Transfer logs at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// At least one Transfer log was retrieved
    Activity,
    /// Zero Transfer logs in the window; anomalies are not evaluated
    NoTransfers,
}

/// Why a single log was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MalformedLog {
    /// Fewer than 3 topics (e.g. ERC-721 style or anonymous events)
    MissingTopics { found: usize },
    /// Topic is not a 32-byte hex word
    BadTopic { index: usize },
    /// Empty data payload
    EmptyData,
    /// Data payload is not hex
    BadData,
    /// Amount does not fit the signed delta range
    AmountOverflow,
}

impl fmt::Display for MalformedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTopics { found } => write!(f, "expected 3 topics, found {}", found),
            Self::BadTopic { index } => write!(f, "topic {} is not a 32-byte word", index),
            Self::EmptyData => f.write_str("empty data payload"),
            Self::BadData => f.write_str("data payload is not valid hex"),
            Self::AmountOverflow => f.write_str("amount exceeds signed 256-bit range"),
        }
    }
}

/// Recoverable problems absorbed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Chunk skipped after exhausting attempts
    ChunkFailed {
        from_block: u64,
        to_block: u64,
        attempts: u32,
        code: String,
        message: String,
    },
    /// Individual log skipped
    LogSkipped {
        block_number: Option<u64>,
        reason: MalformedLog,
    },
    /// Identity linking failed for a top holder
    LinkFailed { address: Address, message: String },
}

/// Point-in-time reconstruction over the scanned window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderSnapshot {
    pub token: Address,
    pub status: SnapshotStatus,
    /// Descending by balance, at most top-N entries
    pub top_holders: Vec<HolderBalance>,
    /// Percent of positive supply held by `top_holders`, 2 decimals
    pub centralization_score: f64,
    pub anomalies: Vec<Anomaly>,
    /// Addresses with strictly positive reconstructed balance
    pub total_holder_count: usize,
    pub total_supply_calculated: U256,
    /// Transfer logs retrieved, including skipped ones
    pub transfer_events: usize,
    pub scanned_from: u64,
    pub scanned_to: u64,
    pub chunks_total: usize,
    pub chunks_failed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl HolderSnapshot {
    /// Empty-activity result for a window with zero Transfer logs
    pub fn no_transfers(token: Address, scanned_from: u64, scanned_to: u64) -> Self {
        Self {
            token,
            status: SnapshotStatus::NoTransfers,
            top_holders: Vec::new(),
            centralization_score: 0.0,
            anomalies: Vec::new(),
            total_holder_count: 0,
            total_supply_calculated: U256::ZERO,
            transfer_events: 0,
            scanned_from,
            scanned_to,
            chunks_total: 0,
            chunks_failed: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_empty_activity(&self) -> bool {
        self.status == SnapshotStatus::NoTransfers
    }

    pub fn has_anomaly(&self, anomaly: Anomaly) -> bool {
        self.anomalies.contains(&anomaly)
    }

    pub fn anomaly_names(&self) -> Vec<String> {
        self.anomalies.iter().map(|a| a.as_str().to_string()).collect()
    }
}

// ============================================
// HOLDER IDENTITY
// ============================================

/// Logical owner of one or more addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub id: Uuid,
    /// Cosmetic label, not an identity key
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Holder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A ledger address bound to exactly one holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderAddress {
    pub id: Uuid,
    pub holder_id: Uuid,
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

/// Observed balance of one address for one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderTokenLink {
    pub id: Uuid,
    pub address_id: Uuid,
    pub token: Address,
    pub balance: U256,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What `link_token` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    Created,
    Unchanged,
    Updated,
}

/// Result of linking one observed holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    pub holder_id: Uuid,
    pub address_id: Uuid,
    /// A new Holder identity was created by this call
    pub new_identity: bool,
    pub link: LinkOutcome,
}

// ============================================
// TOKEN PROFILE
// ============================================

/// ERC-20 metadata; each field is best effort
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Go,
    NoGo,
    EnhancedDueDiligence,
    #[default]
    Pending,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Go => "GO",
            Self::NoGo => "NO GO",
            Self::EnhancedDueDiligence => "Enhanced Due Diligence",
            Self::Pending => "Pending",
        }
    }
}

/// Per-token summary merged from both engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenProfile {
    pub token_address: Address,
    pub metadata: TokenMetadata,
    pub risk_score: u8,
    pub recommendation: Recommendation,
    pub flags: Vec<String>,
    /// Module name -> module summary
    pub modules: serde_json::Map<String, serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl TokenProfile {
    pub fn pending(token_address: Address) -> Self {
        Self {
            token_address,
            metadata: TokenMetadata::default(),
            risk_score: 0,
            recommendation: Recommendation::Pending,
            flags: Vec::new(),
            modules: serde_json::Map::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Append-only record of one bytecode analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractAnalysisRecord {
    pub id: Uuid,
    pub token: Address,
    pub report: BytecodeReport,
    pub engine_version: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Append-only record of one holder reconstruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderAnalysisRecord {
    pub id: Uuid,
    pub token: Address,
    pub snapshot: HolderSnapshot,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
}
