//! Token Compliance CLI
//!
//! Usage:
//!   token_compliance bytecode <address>
//!   token_compliance holders <address> [from] [to] [top_n]
//!   token_compliance assess <address>
//!
//! Environment:
//!   ETH_RPC_URL / ETH_RPC_FALLBACK_URL / ALCHEMY_API_KEY - ledger endpoint
//!   COMPLIANCE_*                                        - analysis thresholds
//!   RUST_LOG                                            - log level (default: info)

use eyre::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use token_compliance::cli::{Cli, Command};
use token_compliance::utils::constants::{APP_NAME, APP_VERSION};
use token_compliance::{
    AnalysisConfig, BytecodeAnalyzer, HolderLinker, HolderReconstructor, LedgerProvider,
    MemoryStore, ProfileAggregator, RpcProvider,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = AnalysisConfig::from_env()?;
    let provider: Arc<dyn LedgerProvider> = Arc::new(RpcProvider::from_env()?);
    info!("🚀 {} v{} | {:?}", APP_NAME, APP_VERSION, cli.command);

    match cli.command {
        Command::Bytecode { address } => {
            let report = BytecodeAnalyzer::new(provider, config)
                .analyze_bytecode(address)
                .await?;
            print_json(&report)
        }
        Command::Holders {
            address,
            from,
            to,
            top_n,
        } => {
            let linker = HolderLinker::new(Arc::new(MemoryStore::new()), config.link_policy);
            let snapshot = HolderReconstructor::new(provider, config)
                .with_linker(linker)
                .reconstruct_holders(
                    address,
                    from.and_then(|b| b.resolve()),
                    to.and_then(|b| b.resolve()),
                    top_n,
                )
                .await?;
            print_json(&snapshot)
        }
        Command::Assess { address } => {
            let profile = ProfileAggregator::new(provider, Arc::new(MemoryStore::new()), config)
                .assess(address)
                .await?;
            print_json(&profile)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
