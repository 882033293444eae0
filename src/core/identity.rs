//! Holder Identity Linker
//!
//! Maps observed addresses to persistent holder identities. One address
//! belongs to exactly one holder; one (address, token) pair has exactly
//! one balance link.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::debug;

use crate::models::config::LinkPolicy;
use crate::models::errors::AppResult;
use crate::models::types::{Holder, LinkReport};
use crate::storage::{AddressInsert, ComplianceStore};
use crate::utils::names::generate_holder_name;

#[derive(Clone)]
pub struct HolderLinker {
    store: Arc<dyn ComplianceStore>,
    policy: LinkPolicy,
}

impl HolderLinker {
    pub fn new(store: Arc<dyn ComplianceStore>, policy: LinkPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn ComplianceStore> {
        &self.store
    }

    /// Resolve or create the identity for `address`, then record its
    /// balance for `token` under the configured link policy.
    pub async fn link_holder(
        &self,
        token: Address,
        address: Address,
        balance: U256,
    ) -> AppResult<LinkReport> {
        let (record, new_identity) = match self.store.find_address(address).await? {
            Some(record) => (record, false),
            None => {
                let holder = Holder::new(generate_holder_name());
                match self.store.create_holder_with_address(holder, address).await? {
                    AddressInsert::Created(record) => {
                        debug!("New holder {} for {}", record.holder_id, address);
                        (record, true)
                    }
                    AddressInsert::Existing(record) => {
                        debug!("Concurrent insert for {}, reusing holder {}", address, record.holder_id);
                        (record, false)
                    }
                }
            }
        };

        let link = self
            .store
            .link_token(record.id, token, balance, self.policy)
            .await?;

        Ok(LinkReport {
            holder_id: record.holder_id,
            address_id: record.id,
            new_identity,
            link,
        })
    }
}
