use alloy_primitives::Address;
use clap::{Parser, Subcommand};

use crate::utils::blocks::BlockRef;

/// Token compliance checks against an EVM JSON-RPC node
#[derive(Parser, Debug)]
#[command(name = "token_compliance", version)]
#[command(about = "Bytecode risk and holder concentration checks for ERC-20 tokens", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Static risk report for the deployed bytecode
    Bytecode {
        /// Contract address
        address: Address,
    },
    /// Reconstruct top holders from Transfer logs
    Holders {
        /// Token address
        address: Address,
        /// First block (number, 0x-hex, earliest); defaults to head - lookback
        from: Option<BlockRef>,
        /// Last block (number, 0x-hex, latest); defaults to head
        to: Option<BlockRef>,
        /// Holders to report
        top_n: Option<usize>,
    },
    /// Full token profile with recommendation
    Assess {
        /// Token address
        address: Address,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
