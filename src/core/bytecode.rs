//! Bytecode Risk Analyzer
//!
//! Static inspection of deployed runtime code:
//! 1. Fetch code (empty code is a hard `CONTRACT_NO_CODE` failure)
//! 2. keccak256 fingerprint + Shannon entropy over raw bytes
//! 3. Linear disassembly into mnemonics
//! 4. Ordered checks, each adding one flag + one evidence line
//! 5. Informational scan for known 4-byte selectors
//! 6. score = max(0, 100 - penalty * flags)
//!
//! Everything after the fetch is a pure function of the code bytes.

use alloy_primitives::{keccak256, Address};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::core::opcodes::{disassemble, CALLCODE, CREATE, CREATE2, DELEGATECALL};
use crate::models::config::AnalysisConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{BytecodeFlag, BytecodeReport};
use crate::providers::LedgerProvider;
use crate::utils::constants::{KNOWN_SELECTORS, TRANSFER_SELECTOR};

pub struct BytecodeAnalyzer {
    provider: Arc<dyn LedgerProvider>,
    config: AnalysisConfig,
}

impl BytecodeAnalyzer {
    pub fn new(provider: Arc<dyn LedgerProvider>, config: AnalysisConfig) -> Self {
        Self { provider, config }
    }

    /// Fetch the code at `address` and build its report
    pub async fn analyze_bytecode(&self, address: Address) -> AppResult<BytecodeReport> {
        let start = Instant::now();

        let deadline = self.provider.call_deadline(self.config.call_timeout);
        let code = tokio::time::timeout(deadline, self.provider.get_code(address)).await??;

        if code.is_empty() {
            return Err(AppError::no_code(address));
        }

        let report = analyze_code(address, &code, &self.config);
        info!(
            "🔍 Bytecode {} | size: {}B | score: {} | flags: {:?} | {}ms",
            address,
            report.bytecode_size,
            report.risk_score,
            report.flag_names(),
            start.elapsed().as_millis()
        );
        Ok(report)
    }
}

/// Pure analysis of already-fetched code
pub fn analyze_code(address: Address, code: &[u8], config: &AnalysisConfig) -> BytecodeReport {
    let code_hex = hex::encode(code);
    let bytecode_hash = format!("0x{}", hex::encode(keccak256(code)));
    let entropy_bits = shannon_entropy(code);

    let instructions = disassemble(code);
    let has_opcode = |op: u8| instructions.iter().any(|i| i.opcode == op);

    let mut flags = Vec::new();
    let mut evidence = Vec::new();

    if has_opcode(DELEGATECALL) {
        flags.push(BytecodeFlag::ProxyDetected);
        evidence.push("DELEGATECALL instruction found in bytecode".to_string());
    }

    if has_opcode(CREATE) || has_opcode(CREATE2) {
        flags.push(BytecodeFlag::ContractFactoryDetected);
        evidence.push("CREATE/CREATE2 instruction found (contract factory behavior)".to_string());
    }

    if has_opcode(CALLCODE) {
        flags.push(BytecodeFlag::DeprecatedCallcodeUsed);
        evidence.push("CALLCODE is deprecated and unsafe".to_string());
    }

    if !code_hex.contains(TRANSFER_SELECTOR) {
        flags.push(BytecodeFlag::NonstandardTransfer);
        evidence.push("Missing ERC20 transfer(address,uint256) selector".to_string());
    }

    if entropy_bits > config.entropy_threshold {
        flags.push(BytecodeFlag::ObfuscatedCode);
        evidence.push(format!(
            "Bytecode entropy is high ({:.2}), may be obfuscated",
            entropy_bits
        ));
    }

    let matched_function_signatures = match_known_selectors(&code_hex);
    debug!("Matched selectors for {}: {:?}", address, matched_function_signatures);

    let opcode_trace = instructions
        .iter()
        .take(config.opcode_trace_limit)
        .map(|i| i.mnemonic().into_owned())
        .collect();

    BytecodeReport {
        address,
        risk_score: score_for(flags.len(), config.flag_penalty),
        flags,
        evidence,
        bytecode_hash,
        entropy_bits,
        matched_function_signatures,
        opcode_trace,
        bytecode_size: code.len(),
    }
}

/// Shannon entropy in bits per byte, rounded to 2 decimals. 0.0 for empty input.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0usize; 256];
    for &b in data {
        counts[b as usize] += 1;
    }

    let len = data.len() as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum();

    (entropy * 100.0).round() / 100.0
}

/// Signatures whose selector appears anywhere in the code hex
pub fn match_known_selectors(code_hex: &str) -> Vec<String> {
    KNOWN_SELECTORS
        .iter()
        .filter(|(selector, _)| code_hex.contains(selector))
        .map(|(_, signature)| signature.to_string())
        .collect()
}

/// 100 minus `penalty` per flag, floored at 0
pub fn score_for(flag_count: usize, penalty: u8) -> u8 {
    let deduction = (flag_count as u64).saturating_mul(penalty as u64);
    100u64.saturating_sub(deduction) as u8
}
