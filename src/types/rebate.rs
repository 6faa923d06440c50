//! Calculated rebate types
//!
//! This module defines the output side of the engine: the per-level rebate
//! rows, their persisted form, the chunk manifest, and the run summary.

use super::error::RebateError;
use super::rules::RebateLevel;
use super::transaction::{ProviderCode, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Rule source that produced the final rate for a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CalculationType {
    /// Base Visa/MCO rule table
    #[serde(rename = "visa_mco")]
    VisaMco,

    /// PartnerPay rule table (BIN and airline specific)
    #[serde(rename = "partnerpay")]
    PartnerPay,

    /// Region/country override for designated providers
    #[serde(rename = "region_country")]
    RegionCountry,

    /// Voyage-privé override for designated providers
    #[serde(rename = "voyage_prive")]
    VoyagePrive,
}

impl CalculationType {
    /// Stable label used in exports and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationType::VisaMco => "visa_mco",
            CalculationType::PartnerPay => "partnerpay",
            CalculationType::RegionCountry => "region_country",
            CalculationType::VoyagePrive => "voyage_prive",
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rebate entitlement for a (transaction, level) pair
///
/// Only created when the resolved rate is strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedRebate {
    pub transaction_id: TransactionId,
    pub provider_customer_code: ProviderCode,
    pub product_name: String,

    /// Display merchant name (airline-enhanced for the airline MCC)
    pub merchant_name: String,

    /// Rebate level (1-8)
    pub rebate_level: RebateLevel,

    /// Applied rate in percent
    pub rebate_percentage: Decimal,

    /// Rebate in the original transaction currency, rounded to 2 dp
    pub rebate_amount: Decimal,

    /// Rebate in EUR, rounded to 2 dp
    pub rebate_amount_eur: Decimal,

    pub calculation_type: CalculationType,
}

/// A rebate as persisted by the chunked store
///
/// `id` is sequential and unique across a single write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRebate {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub rebate: CalculatedRebate,
}

/// Manifest describing one completed chunked write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub total_rebates: usize,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub created_at: DateTime<Utc>,
}

/// Aggregate figures for a calculation run
///
/// Breakdowns by calculation type and provider are expressed in EUR so that
/// amounts from different currencies can be added together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebateSummary {
    /// Number of transactions considered
    pub transaction_count: usize,

    /// Number of rebate rows produced
    pub rebate_count: usize,

    /// Sum of `rebate_amount` (original currencies)
    pub total_amount: Decimal,

    /// Sum of `rebate_amount_eur`
    pub total_amount_eur: Decimal,

    /// EUR total per calculation type
    pub amount_by_type: BTreeMap<CalculationType, Decimal>,

    /// EUR total per provider customer code
    pub amount_by_provider: BTreeMap<ProviderCode, Decimal>,
}

impl RebateSummary {
    /// Fold the rebates of one transaction into the running totals
    ///
    /// Either every rebate is added or, when any total would overflow, none
    /// is and the summary is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if a total cannot be represented.
    pub fn add_all(&mut self, rebates: &[CalculatedRebate]) -> Result<(), RebateError> {
        let mut total_amount = self.total_amount;
        let mut total_amount_eur = self.total_amount_eur;
        let mut by_type: BTreeMap<CalculationType, Decimal> = BTreeMap::new();
        let mut by_provider: BTreeMap<&str, Decimal> = BTreeMap::new();

        for rebate in rebates {
            total_amount = checked_total(total_amount, rebate.rebate_amount, rebate)?;
            total_amount_eur = checked_total(total_amount_eur, rebate.rebate_amount_eur, rebate)?;

            let type_total = by_type.entry(rebate.calculation_type).or_insert_with(|| {
                self.amount_by_type
                    .get(&rebate.calculation_type)
                    .copied()
                    .unwrap_or_default()
            });
            *type_total = checked_total(*type_total, rebate.rebate_amount_eur, rebate)?;

            let provider = rebate.provider_customer_code.as_str();
            let provider_total = by_provider.entry(provider).or_insert_with(|| {
                self.amount_by_provider
                    .get(provider)
                    .copied()
                    .unwrap_or_default()
            });
            *provider_total = checked_total(*provider_total, rebate.rebate_amount_eur, rebate)?;
        }

        self.rebate_count += rebates.len();
        self.total_amount = total_amount;
        self.total_amount_eur = total_amount_eur;
        self.amount_by_type.extend(by_type);
        self.amount_by_provider.extend(
            by_provider
                .into_iter()
                .map(|(provider, total)| (provider.to_string(), total)),
        );
        Ok(())
    }
}

fn checked_total(
    total: Decimal,
    amount: Decimal,
    rebate: &CalculatedRebate,
) -> Result<Decimal, RebateError> {
    total
        .checked_add(amount)
        .ok_or_else(|| RebateError::arithmetic_overflow("rebate summary", &rebate.transaction_id))
}
