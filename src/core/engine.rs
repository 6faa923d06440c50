//! Rebate calculation engine
//!
//! This module provides the `RebateCalculationEngine`, which drives the
//! per-transaction priority resolution over a batch of transactions and
//! aggregates the results.
//!
//! The engine enforces the run-level rules:
//! - Per-transaction failures (missing ID, arithmetic overflow) become warnings
//!   and the batch continues
//! - Rows are emitted in input order, then by level within a transaction
//! - Persisting through the chunked store is all-or-nothing: any storage
//!   failure aborts the run

use super::merchant::MerchantNameEnhancer;
use super::priority::PriorityEngine;
use super::resolvers::{RegionCountryResolver, VoyagePriveResolver};
use super::rule_tables::{BaseTables, RegionCountryTable, VoyagePriveTable};
use crate::config::RebateConfig;
use crate::store::{ChunkBackend, ChunkedRebateStore};
use crate::types::{
    AirlineEntry, CalculatedRebate, PartnerPayRow, RebateError, RebateSummary, RegionCountryRow,
    Transaction, VisaMcoRow, VoyagePriveRow,
};
use tracing::{info, warn};

/// Everything a calculation run produces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationOutcome {
    /// Rebate rows in input order
    pub rebates: Vec<CalculatedRebate>,
    pub summary: RebateSummary,
    /// Human-readable warnings (configuration, skipped rows, failed transactions)
    pub warnings: Vec<String>,
}

impl CalculationOutcome {
    /// Record the resolution result of one transaction
    ///
    /// A transaction whose rebates would overflow the summary totals is
    /// reported like any other failed transaction and contributes no rows.
    pub fn record(
        &mut self,
        transaction_id: &str,
        result: Result<Vec<CalculatedRebate>, RebateError>,
    ) {
        self.summary.transaction_count += 1;
        let recorded = result.and_then(|rebates| {
            self.summary.add_all(&rebates)?;
            Ok(rebates)
        });
        match recorded {
            Ok(rebates) => self.rebates.extend(rebates),
            Err(e) => {
                warn!(transaction_id, error = %e, "transaction skipped");
                self.warnings
                    .push(format!("Transaction '{}': {}", transaction_id, e));
            }
        }
    }

    /// Record an input row that never became a transaction
    pub fn record_skipped_row(&mut self, error: &RebateError) {
        warn!(error = %error, "input row skipped");
        self.warnings.push(format!("Skipped input row: {}", error));
    }
}

/// Rebate calculation engine
///
/// Owns the override tables, the airline reference table, and the
/// configuration. The two base tables (Visa/MCO and PartnerPay) are supplied
/// per run.
#[derive(Debug, Clone)]
pub struct RebateCalculationEngine {
    priority: PriorityEngine,
    config: RebateConfig,
}

impl RebateCalculationEngine {
    /// Create an engine from configuration and the engine-owned tables
    pub fn new(
        config: RebateConfig,
        region_country: Vec<RegionCountryRow>,
        voyage_prive: Vec<VoyagePriveRow>,
        airlines: Vec<AirlineEntry>,
    ) -> Self {
        let priority = PriorityEngine::new(
            MerchantNameEnhancer::new(&config.airline_mcc, airlines),
            RegionCountryResolver::new(
                config.region_country_providers.clone(),
                RegionCountryTable::new(region_country),
            ),
            VoyagePriveResolver::new(
                config.voyage_prive_providers.clone(),
                VoyagePriveTable::new(voyage_prive),
            ),
        );
        RebateCalculationEngine { priority, config }
    }

    pub fn config(&self) -> &RebateConfig {
        &self.config
    }

    /// Warnings about the configuration itself
    ///
    /// A provider listed in both override sets gets region/country overrides
    /// first and voyage-privé overrides second.
    pub fn configuration_warnings(&self) -> Vec<String> {
        self.config
            .overlapping_providers()
            .into_iter()
            .map(|provider| {
                format!(
                    "Provider '{}' is configured for both region/country and voyage-privé overrides; voyage-privé rates take precedence",
                    provider
                )
            })
            .collect()
    }

    /// An empty outcome seeded with the configuration warnings
    pub fn begin_outcome(&self) -> CalculationOutcome {
        let warnings = self.configuration_warnings();
        for warning in &warnings {
            warn!("{}", warning);
        }
        CalculationOutcome {
            warnings,
            ..Default::default()
        }
    }

    /// Final rebate rows for one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction has no ID or an amount overflows.
    pub fn resolve_transaction(
        &self,
        transaction: &Transaction,
        tables: &BaseTables,
    ) -> Result<Vec<CalculatedRebate>, RebateError> {
        self.priority.resolve(transaction, tables)
    }

    /// Calculate rebates for a batch of transactions
    ///
    /// Builds the base table indexes once and resolves every transaction in
    /// input order.
    pub fn calculate(
        &self,
        transactions: &[Transaction],
        visa_mco: Vec<VisaMcoRow>,
        partner_pay: Vec<PartnerPayRow>,
    ) -> CalculationOutcome {
        let tables = BaseTables::new(visa_mco, partner_pay);
        self.calculate_with_tables(transactions, &tables)
    }

    /// Calculate rebates against prebuilt base tables
    pub fn calculate_with_tables(
        &self,
        transactions: &[Transaction],
        tables: &BaseTables,
    ) -> CalculationOutcome {
        info!(
            transactions = transactions.len(),
            visa_mco_rules = tables.visa_mco.len(),
            partner_pay_rules = tables.partner_pay.len(),
            "calculating rebates"
        );

        let mut outcome = self.begin_outcome();
        for transaction in transactions {
            outcome.record(
                &transaction.transaction_id,
                self.resolve_transaction(transaction, tables),
            );
        }

        info!(
            rebates = outcome.summary.rebate_count,
            total_amount_eur = %outcome.summary.total_amount_eur,
            warnings = outcome.warnings.len(),
            "calculation finished"
        );
        outcome
    }

    /// Calculate rebates and persist them through the chunked store
    ///
    /// # Errors
    ///
    /// Any storage failure is fatal and returned; per-transaction failures are
    /// still reported as warnings in the outcome.
    pub fn calculate_and_store<B: ChunkBackend>(
        &self,
        transactions: &[Transaction],
        visa_mco: Vec<VisaMcoRow>,
        partner_pay: Vec<PartnerPayRow>,
        store: &mut ChunkedRebateStore<B>,
    ) -> Result<CalculationOutcome, RebateError> {
        let outcome = self.calculate(transactions, visa_mco, partner_pay);
        store.write_all(&outcome.rebates)?;
        Ok(outcome)
    }
}
