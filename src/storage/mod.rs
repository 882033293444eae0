//! Storage Module - Persistence for identities, analyses and profiles
//!
//! The engines only see the `ComplianceStore` trait; `MemoryStore` is the
//! bundled implementation.

pub mod memory;

pub use memory::*;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::config::LinkPolicy;
use crate::models::errors::AppResult;
use crate::models::types::{
    BytecodeReport, ContractAnalysisRecord, Holder, HolderAddress, HolderAnalysisRecord,
    HolderSnapshot, HolderTokenLink, LinkOutcome, TokenProfile,
};

/// Result of an address insert. `Existing` means another writer got there first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressInsert {
    Created(HolderAddress),
    Existing(HolderAddress),
}

impl AddressInsert {
    pub fn record(&self) -> &HolderAddress {
        match self {
            Self::Created(rec) | Self::Existing(rec) => rec,
        }
    }
}

#[async_trait]
pub trait ComplianceStore: Send + Sync {
    async fn find_address(&self, address: Address) -> AppResult<Option<HolderAddress>>;

    /// Atomically bind `address` to the new `holder`. If the address is
    /// already bound, nothing is written and the existing record is returned.
    async fn create_holder_with_address(
        &self,
        holder: Holder,
        address: Address,
    ) -> AppResult<AddressInsert>;

    async fn find_holder(&self, id: Uuid) -> AppResult<Option<Holder>>;

    /// Record a balance observation, unique on (address_id, token)
    async fn link_token(
        &self,
        address_id: Uuid,
        token: Address,
        balance: U256,
        policy: LinkPolicy,
    ) -> AppResult<LinkOutcome>;

    async fn find_link(&self, address_id: Uuid, token: Address)
        -> AppResult<Option<HolderTokenLink>>;

    async fn holder_count(&self) -> AppResult<usize>;
    async fn address_count(&self) -> AppResult<usize>;
    async fn link_count(&self) -> AppResult<usize>;

    async fn append_contract_analysis(
        &self,
        token: Address,
        report: &BytecodeReport,
    ) -> AppResult<ContractAnalysisRecord>;

    async fn append_holder_analysis(
        &self,
        token: Address,
        snapshot: &HolderSnapshot,
    ) -> AppResult<HolderAnalysisRecord>;

    /// Oldest first
    async fn contract_analyses(&self, token: Address) -> AppResult<Vec<ContractAnalysisRecord>>;

    /// Oldest first
    async fn holder_analyses(&self, token: Address) -> AppResult<Vec<HolderAnalysisRecord>>;

    async fn upsert_profile(&self, profile: &TokenProfile) -> AppResult<()>;
    async fn get_profile(&self, token: Address) -> AppResult<Option<TokenProfile>>;
}
