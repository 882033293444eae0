//! ERC-20 metadata lookup (name, symbol, decimals) via eth_call

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use tracing::debug;

use super::ledger::LedgerProvider;
use crate::models::types::TokenMetadata;

sol! {
    function name() external view returns (string);
    function symbol() external view returns (string);
    function decimals() external view returns (uint8);
}

/// Best effort: a reverting or undecodable getter leaves its field `None`
pub async fn fetch_token_metadata(provider: &dyn LedgerProvider, token: Address) -> TokenMetadata {
    let name = call_getter(provider, token, nameCall {})
        .await
        .map(|r| r._0);
    let symbol = call_getter(provider, token, symbolCall {})
        .await
        .map(|r| r._0);
    let decimals = call_getter(provider, token, decimalsCall {})
        .await
        .map(|r| r._0);

    TokenMetadata {
        name,
        symbol,
        decimals,
    }
}

async fn call_getter<C: SolCall>(
    provider: &dyn LedgerProvider,
    token: Address,
    call: C,
) -> Option<C::Return> {
    let calldata = Bytes::from(call.abi_encode());
    let raw = match provider.call(token, calldata).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!("{} call failed on {}: {}", C::SIGNATURE, token, e);
            return None;
        }
    };
    match C::abi_decode_returns(&raw, true) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            debug!("{} returned undecodable data on {}: {}", C::SIGNATURE, token, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::StaticLedger;
    use alloy_primitives::U256;

    fn abi_string(s: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&U256::from(32).to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(s.len()).to_be_bytes::<32>());
        let mut body = s.as_bytes().to_vec();
        body.resize(s.len().div_ceil(32) * 32, 0);
        out.extend_from_slice(&body);
        out
    }

    #[tokio::test]
    async fn test_fetch_metadata() {
        let token = Address::repeat_byte(0x42);
        let ledger = StaticLedger::new(1)
            .with_call(token, nameCall::SELECTOR, abi_string("Test Token"))
            .with_call(token, symbolCall::SELECTOR, abi_string("TST"))
            .with_call(token, decimalsCall::SELECTOR, U256::from(18).to_be_bytes::<32>().to_vec());

        let metadata = fetch_token_metadata(&ledger, token).await;
        assert_eq!(metadata.name.as_deref(), Some("Test Token"));
        assert_eq!(metadata.symbol.as_deref(), Some("TST"));
        assert_eq!(metadata.decimals, Some(18));
    }

    #[tokio::test]
    async fn test_reverting_getters_leave_fields_empty() {
        let ledger = StaticLedger::new(1);
        let metadata = fetch_token_metadata(&ledger, Address::ZERO).await;
        assert_eq!(metadata, TokenMetadata::default());
    }
}
