//! In-memory store backed by DashMap
//!
//! Uniqueness on address and on (address, token) comes from the entry API:
//! the shard lock is held between the lookup and the insert.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{AddressInsert, ComplianceStore};
use crate::models::config::LinkPolicy;
use crate::models::errors::AppResult;
use crate::models::types::{
    BytecodeReport, ContractAnalysisRecord, Holder, HolderAddress, HolderAnalysisRecord,
    HolderSnapshot, HolderTokenLink, LinkOutcome, TokenProfile,
};
use crate::utils::constants::ENGINE_VERSION;

#[derive(Clone, Default)]
pub struct MemoryStore {
    holders: Arc<DashMap<Uuid, Holder>>,
    addresses: Arc<DashMap<Address, HolderAddress>>,
    links: Arc<DashMap<(Uuid, Address), HolderTokenLink>>,
    contract_records: Arc<DashMap<Address, Vec<ContractAnalysisRecord>>>,
    holder_records: Arc<DashMap<Address, Vec<HolderAnalysisRecord>>>,
    profiles: Arc<DashMap<Address, TokenProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComplianceStore for MemoryStore {
    async fn find_address(&self, address: Address) -> AppResult<Option<HolderAddress>> {
        Ok(self.addresses.get(&address).map(|rec| rec.clone()))
    }

    async fn create_holder_with_address(
        &self,
        holder: Holder,
        address: Address,
    ) -> AppResult<AddressInsert> {
        match self.addresses.entry(address) {
            Entry::Occupied(existing) => {
                debug!("Address {} already bound, keeping existing holder", address);
                Ok(AddressInsert::Existing(existing.get().clone()))
            }
            Entry::Vacant(slot) => {
                let record = HolderAddress {
                    id: Uuid::new_v4(),
                    holder_id: holder.id,
                    address,
                    created_at: Utc::now(),
                };
                self.holders.insert(holder.id, holder);
                slot.insert(record.clone());
                Ok(AddressInsert::Created(record))
            }
        }
    }

    async fn find_holder(&self, id: Uuid) -> AppResult<Option<Holder>> {
        Ok(self.holders.get(&id).map(|h| h.clone()))
    }

    async fn link_token(
        &self,
        address_id: Uuid,
        token: Address,
        balance: U256,
        policy: LinkPolicy,
    ) -> AppResult<LinkOutcome> {
        match self.links.entry((address_id, token)) {
            Entry::Occupied(mut existing) => match policy {
                LinkPolicy::FirstWins => Ok(LinkOutcome::Unchanged),
                LinkPolicy::LatestWins if existing.get().balance == balance => {
                    Ok(LinkOutcome::Unchanged)
                }
                LinkPolicy::LatestWins => {
                    let link = existing.get_mut();
                    link.balance = balance;
                    link.updated_at = Utc::now();
                    Ok(LinkOutcome::Updated)
                }
            },
            Entry::Vacant(slot) => {
                let now = Utc::now();
                slot.insert(HolderTokenLink {
                    id: Uuid::new_v4(),
                    address_id,
                    token,
                    balance,
                    created_at: now,
                    updated_at: now,
                });
                Ok(LinkOutcome::Created)
            }
        }
    }

    async fn find_link(
        &self,
        address_id: Uuid,
        token: Address,
    ) -> AppResult<Option<HolderTokenLink>> {
        Ok(self.links.get(&(address_id, token)).map(|l| l.clone()))
    }

    async fn holder_count(&self) -> AppResult<usize> {
        Ok(self.holders.len())
    }

    async fn address_count(&self) -> AppResult<usize> {
        Ok(self.addresses.len())
    }

    async fn link_count(&self) -> AppResult<usize> {
        Ok(self.links.len())
    }

    async fn append_contract_analysis(
        &self,
        token: Address,
        report: &BytecodeReport,
    ) -> AppResult<ContractAnalysisRecord> {
        let record = ContractAnalysisRecord {
            id: Uuid::new_v4(),
            token,
            report: report.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            analyzed_at: Utc::now(),
        };
        self.contract_records
            .entry(token)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn append_holder_analysis(
        &self,
        token: Address,
        snapshot: &HolderSnapshot,
    ) -> AppResult<HolderAnalysisRecord> {
        let record = HolderAnalysisRecord {
            id: Uuid::new_v4(),
            token,
            snapshot: snapshot.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
        };
        self.holder_records
            .entry(token)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn contract_analyses(&self, token: Address) -> AppResult<Vec<ContractAnalysisRecord>> {
        Ok(self
            .contract_records
            .get(&token)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn holder_analyses(&self, token: Address) -> AppResult<Vec<HolderAnalysisRecord>> {
        Ok(self
            .holder_records
            .get(&token)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn upsert_profile(&self, profile: &TokenProfile) -> AppResult<()> {
        self.profiles.insert(profile.token_address, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, token: Address) -> AppResult<Option<TokenProfile>> {
        Ok(self.profiles.get(&token).map(|p| p.clone()))
    }
}
