//! Constants Module - Single Source of Truth
//!
//! Event topics, known selectors and default thresholds live here.
//! Other modules read them through `AnalysisConfig` or directly.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "TokenCompliance";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = "TokenCompliance/0.1.0";

/// Version tag stored with every persisted analysis record
pub const ENGINE_VERSION: &str = "0.1-beta";

// ============================================
// RPC CONSTANTS
// ============================================

/// Default timeout for a single provider call (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// Base retry delay in milliseconds
pub const BASE_RETRY_MS: u64 = 1000;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_MS: u64 = 16000;

/// Maximum attempts per endpoint for a single JSON-RPC call
pub const MAX_RPC_RETRIES: u32 = 4;

/// Jitter percentage for retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// Headroom per endpoint on top of the computed retry budget (connect, body read)
pub const DEADLINE_SLACK_MS: u64 = 500;

/// Public Alchemy mainnet endpoint prefix
pub const ALCHEMY_ETH_MAINNET: &str = "https://eth-mainnet.g.alchemy.com/v2/";

/// Build an Alchemy mainnet URL from an API key
pub fn build_alchemy_url(api_key: &str) -> String {
    format!("{}{}", ALCHEMY_ETH_MAINNET, api_key)
}

// ============================================
// EVENT TOPICS
// ============================================

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

// ============================================
// FUNCTION SELECTORS
// ============================================

/// ERC-20 transfer(address,uint256)
pub const TRANSFER_SELECTOR: &str = "a9059cbb";

/// Selectors scanned for in the bytecode hex, with the signature reported
/// on a match. Order is output order.
pub const KNOWN_SELECTORS: [(&str, &str); 8] = [
    ("a9059cbb", "transfer(address,uint256)"),
    ("095ea7b3", "approve(address,uint256)"),
    ("23b872dd", "transferFrom(address,address,uint256)"),
    ("40c10f19", "mint(address,uint256)"),
    ("8da5cb5b", "owner()"),
    ("715018a6", "renounceOwnership()"),
    ("6b5caec4", "setBot(address)"),
    ("dd62ed3e", "allowance(address,address)"),
];

// ============================================
// ANALYSIS DEFAULTS
// ============================================

/// Entropy above this marks bytecode as likely obfuscated (bits per byte)
pub const DEFAULT_ENTROPY_THRESHOLD: f64 = 7.5;

/// Score penalty per raised bytecode flag
pub const DEFAULT_FLAG_PENALTY: u8 = 15;

/// Opcode mnemonics kept in a report
pub const DEFAULT_OPCODE_TRACE_LIMIT: usize = 100;

/// Blocks scanned back from head when no start block is given
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 100_000;

/// Blocks per eth_getLogs request
pub const DEFAULT_CHUNK_SIZE: u64 = 5_000;

/// Pause after each chunk request (milliseconds)
pub const DEFAULT_CHUNK_PACING_MS: u64 = 100;

/// Extra attempts for a chunk that failed with a retryable error
pub const DEFAULT_CHUNK_RETRIES: u32 = 2;

/// Chunk requests in flight at once
pub const DEFAULT_MAX_CONCURRENT_CHUNKS: usize = 1;

/// Holders returned in a snapshot
pub const DEFAULT_TOP_N: usize = 10;

/// Centralization above this (percent) is whale owned
pub const DEFAULT_WHALE_THRESHOLD_PCT: f64 = 80.0;

/// Largest holder share above this (percent) is majority owned
pub const DEFAULT_MAJORITY_THRESHOLD_PCT: f64 = 50.0;

/// Holder counts at or below this are low distribution
pub const DEFAULT_LOW_DISTRIBUTION_FLOOR: usize = 50;

/// Profile scores below this are NO GO
pub const DEFAULT_NO_GO_BELOW: u8 = 30;

/// Profile scores below this need enhanced due diligence
pub const DEFAULT_EDD_BELOW: u8 = 70;
