//! Profile Aggregator
//!
//! Runs both engines for one token, persists their results and folds them
//! into a single `TokenProfile` with a recommendation.

use alloy_primitives::Address;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::bytecode::BytecodeAnalyzer;
use crate::core::holders::HolderReconstructor;
use crate::core::identity::HolderLinker;
use crate::models::config::AnalysisConfig;
use crate::models::errors::{AppResult, ErrorTaxonomy};
use crate::models::types::{
    Anomaly, BytecodeReport, HolderSnapshot, Recommendation, TokenProfile,
};
use crate::providers::{fetch_token_metadata, LedgerProvider};
use crate::storage::ComplianceStore;

pub struct ProfileAggregator {
    provider: Arc<dyn LedgerProvider>,
    store: Arc<dyn ComplianceStore>,
    config: AnalysisConfig,
}

impl ProfileAggregator {
    pub fn new(
        provider: Arc<dyn LedgerProvider>,
        store: Arc<dyn ComplianceStore>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Full assessment over the default window. Provider failures during
    /// the bytecode fetch propagate; a failed holder scan only drops the
    /// holders module.
    pub async fn assess(&self, token: Address) -> AppResult<TokenProfile> {
        let mut profile = self
            .store
            .get_profile(token)
            .await?
            .unwrap_or_else(|| TokenProfile::pending(token));
        profile.metadata = fetch_token_metadata(self.provider.as_ref(), token).await;
        profile.flags.clear();
        profile.modules.clear();

        let analyzer = BytecodeAnalyzer::new(self.provider.clone(), self.config.clone());
        let report = match analyzer.analyze_bytecode(token).await {
            Ok(report) => report,
            Err(e) if e.taxonomy() == ErrorTaxonomy::NoCode => {
                warn!("⛔ {} has no bytecode, marking NO GO", token);
                profile.risk_score = 0;
                profile.recommendation = Recommendation::NoGo;
                profile
                    .modules
                    .insert("contract".to_string(), json!({ "error": e.code_str() }));
                return self.save(profile).await;
            }
            Err(e) => return Err(e),
        };
        self.store.append_contract_analysis(token, &report).await?;

        let linker = HolderLinker::new(self.store.clone(), self.config.link_policy);
        let reconstructor = HolderReconstructor::new(self.provider.clone(), self.config.clone())
            .with_linker(linker);
        let snapshot = match reconstructor.reconstruct_holders(token, None, None, None).await {
            Ok(snapshot) => {
                self.store.append_holder_analysis(token, &snapshot).await?;
                Some(snapshot)
            }
            Err(e) => {
                warn!("⚠️ Holder reconstruction failed for {}: {}", token, e);
                None
            }
        };

        profile.risk_score = report.risk_score;
        profile.flags = report.flag_names();
        profile
            .modules
            .insert("contract".to_string(), contract_summary(&report));
        if let Some(snapshot) = &snapshot {
            profile.flags.extend(snapshot.anomaly_names());
            profile
                .modules
                .insert("holders".to_string(), holders_summary(snapshot));
        }
        profile.recommendation = recommend(
            report.risk_score,
            snapshot.as_ref().map(|s| s.anomalies.as_slice()),
            &self.config,
        );

        info!(
            "📋 {} | score: {} | {} | flags: {:?}",
            token,
            profile.risk_score,
            profile.recommendation.as_str(),
            profile.flags
        );
        self.save(profile).await
    }

    async fn save(&self, mut profile: TokenProfile) -> AppResult<TokenProfile> {
        profile.updated_at = chrono::Utc::now();
        self.store.upsert_profile(&profile).await?;
        Ok(profile)
    }
}

/// `anomalies` is `None` when the holder scan did not complete
pub fn recommend(
    risk_score: u8,
    anomalies: Option<&[Anomaly]>,
    config: &AnalysisConfig,
) -> Recommendation {
    if risk_score < config.no_go_below {
        return Recommendation::NoGo;
    }
    let majority_owned = anomalies
        .map(|a| a.contains(&Anomaly::MajorityOwnedByOneWallet))
        .unwrap_or(true);
    if risk_score < config.edd_below || majority_owned {
        Recommendation::EnhancedDueDiligence
    } else {
        Recommendation::Go
    }
}

fn contract_summary(report: &BytecodeReport) -> serde_json::Value {
    json!({
        "risk_score": report.risk_score,
        "flags": report.flag_names(),
        "evidence": report.evidence,
        "bytecode_hash": report.bytecode_hash,
        "entropy_bits": report.entropy_bits,
        "matched_function_signatures": report.matched_function_signatures,
        "bytecode_size": report.bytecode_size,
    })
}

fn holders_summary(snapshot: &HolderSnapshot) -> serde_json::Value {
    json!({
        "status": snapshot.status,
        "centralization_score": snapshot.centralization_score,
        "total_holder_count": snapshot.total_holder_count,
        "total_supply_calculated": snapshot.total_supply_calculated.to_string(),
        "anomalies": snapshot.anomaly_names(),
        "top_holders": snapshot
            .top_holders
            .iter()
            .map(|h| json!({ "address": h.address, "balance": h.balance.to_string() }))
            .collect::<Vec<_>>(),
        "scanned_from": snapshot.scanned_from,
        "scanned_to": snapshot.scanned_to,
        "chunks_failed": snapshot.chunks_failed,
    })
}
