//! Per-transaction priority resolution
//!
//! The four rule sources are applied as an ordered list of stages. Each stage
//! produces a sparse level-to-candidate map which is folded into the result:
//!
//! ```text
//! VisaMco       insert-if-absent   (first source wins ties)
//! PartnerPay    insert-if-absent
//! RegionCountry overwrite          (configured providers only)
//! VoyagePrive   overwrite          (configured providers only)
//! ```
//!
//! The stage order is fixed and holds regardless of how transactions are
//! scheduled across workers.

use super::merchant::MerchantNameEnhancer;
use super::resolvers::{
    resolve_partner_pay, resolve_visa_mco, CandidateRebate, RegionCountryResolver,
    VoyagePriveResolver,
};
use super::rule_tables::BaseTables;
use crate::types::{CalculatedRebate, RebateError, RebateLevel, Transaction};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// How a stage's candidates are folded into the level map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Keep an existing level, add only missing ones
    InsertIfAbsent,
    /// Replace any level the stage supplies
    Overwrite,
}

/// One rule source in resolution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    VisaMco,
    PartnerPay,
    RegionCountry,
    VoyagePrive,
}

impl ResolutionStage {
    /// Stages in the order they are folded
    pub const ORDER: [ResolutionStage; 4] = [
        ResolutionStage::VisaMco,
        ResolutionStage::PartnerPay,
        ResolutionStage::RegionCountry,
        ResolutionStage::VoyagePrive,
    ];

    pub fn merge_mode(&self) -> MergeMode {
        match self {
            ResolutionStage::VisaMco | ResolutionStage::PartnerPay => MergeMode::InsertIfAbsent,
            ResolutionStage::RegionCountry | ResolutionStage::VoyagePrive => MergeMode::Overwrite,
        }
    }
}

/// Merges resolver outputs into at most one rate per level
///
/// Owns the override resolvers (with their tables) and the merchant name
/// enhancer; the two base tables are passed per call.
#[derive(Debug, Clone)]
pub struct PriorityEngine {
    enhancer: MerchantNameEnhancer,
    region_country: RegionCountryResolver,
    voyage_prive: VoyagePriveResolver,
}

impl PriorityEngine {
    pub fn new(
        enhancer: MerchantNameEnhancer,
        region_country: RegionCountryResolver,
        voyage_prive: VoyagePriveResolver,
    ) -> Self {
        PriorityEngine {
            enhancer,
            region_country,
            voyage_prive,
        }
    }

    /// Sparse candidates of one stage: only the levels its source supplies
    fn stage_candidates(
        &self,
        stage: ResolutionStage,
        transaction: &Transaction,
        tables: &BaseTables,
    ) -> Result<Vec<CandidateRebate>, RebateError> {
        match stage {
            ResolutionStage::VisaMco => resolve_visa_mco(transaction, &tables.visa_mco),
            ResolutionStage::PartnerPay => resolve_partner_pay(transaction, &tables.partner_pay),
            ResolutionStage::RegionCountry => {
                self.region_country.resolve(transaction, &tables.visa_mco)
            }
            ResolutionStage::VoyagePrive => self.voyage_prive.resolve(transaction),
        }
    }

    /// Fold all stages into a level-keyed map of final candidates
    pub fn resolve_levels(
        &self,
        transaction: &Transaction,
        tables: &BaseTables,
    ) -> Result<BTreeMap<RebateLevel, CandidateRebate>, RebateError> {
        let mut merged: BTreeMap<RebateLevel, CandidateRebate> = BTreeMap::new();

        for stage in ResolutionStage::ORDER {
            for candidate in self.stage_candidates(stage, transaction, tables)? {
                match stage.merge_mode() {
                    MergeMode::InsertIfAbsent => {
                        merged.entry(candidate.level).or_insert(candidate);
                    }
                    MergeMode::Overwrite => {
                        merged.insert(candidate.level, candidate);
                    }
                }
            }
        }

        Ok(merged)
    }

    /// Final rebate rows for a transaction, ordered by level
    ///
    /// Levels whose final rate is not strictly positive (a zero override) are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction has no ID or an amount overflows.
    pub fn resolve(
        &self,
        transaction: &Transaction,
        tables: &BaseTables,
    ) -> Result<Vec<CalculatedRebate>, RebateError> {
        if transaction.transaction_id.trim().is_empty() {
            return Err(RebateError::invalid_transaction(
                &transaction.transaction_id,
                "missing transaction id",
            ));
        }

        let merged = self.resolve_levels(transaction, tables)?;
        if merged.is_empty() {
            return Ok(Vec::new());
        }

        let merchant_name = self.enhancer.enhance(transaction);
        Ok(merged
            .into_values()
            .filter(|candidate| candidate.rate > Decimal::ZERO)
            .map(|candidate| candidate.into_rebate(transaction, &merchant_name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rule_tables::{RegionCountryTable, VoyagePriveTable};
    use crate::types::{
        AirlineEntry, CalculationType, LevelRate, PartnerPayRow, ProviderCode, RebateLevels,
        RegionCountryRow, VisaMcoRow, VoyagePriveRow,
    };
    use std::collections::BTreeSet;

    fn dec(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    fn providers(codes: &[&str]) -> BTreeSet<ProviderCode> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn transaction(provider: &str) -> Transaction {
        Transaction {
            transaction_id: "T1".to_string(),
            provider_customer_code: provider.to_string(),
            salesforce_product_name: "X".to_string(),
            bin_card_number: "557062xxxxxx".to_string(),
            merchant_name: "LUFTHANSA 220".to_string(),
            transaction_merchant_category_code: "4511".to_string(),
            transaction_amount: dec(100000, 2),
            transaction_amount_eur: dec(100000, 2),
            region_mc: "EU".to_string(),
            transaction_merchant_country: "DE".to_string(),
            ..Default::default()
        }
    }

    fn levels(rates: &[(RebateLevel, Option<Decimal>, Option<Decimal>)]) -> RebateLevels {
        let mut levels = RebateLevels::default();
        for &(level, yearly, monthly) in rates {
            levels.set(level, LevelRate::new(yearly, monthly));
        }
        levels
    }

    fn tables(provider: &str) -> BaseTables {
        BaseTables::new(
            vec![VisaMcoRow {
                provider_customer_code: provider.to_string(),
                salesforce_product_name: "X".to_string(),
                levels: levels(&[(1, Some(dec(5, 1)), None), (2, None, Some(dec(2, 1)))]),
            }],
            vec![PartnerPayRow {
                provider_customer_code: "partnerpay".to_string(),
                salesforce_product_name: "X".to_string(),
                partner_pay_bin: "Tier 1: 557062".to_string(),
                partner_pay_airline: "LUFTHANSA 220".to_string(),
                levels: levels(&[(1, Some(dec(9, 1)), None), (3, Some(dec(3, 1)), None)]),
            }],
        )
    }

    fn engine(region: &[&str], voyage: &[&str]) -> PriorityEngine {
        PriorityEngine::new(
            MerchantNameEnhancer::new("4511", vec![AirlineEntry::new("Lufthansa", "LH")]),
            RegionCountryResolver::new(
                providers(region),
                RegionCountryTable::new(vec![RegionCountryRow {
                    provider_customer_code: "P".to_string(),
                    salesforce_product_name: "X".to_string(),
                    region_mc: "EU".to_string(),
                    merchant_country: "*".to_string(),
                    levels: levels(&[(2, Some(dec(6, 1)), None)]),
                }]),
            ),
            VoyagePriveResolver::new(
                providers(voyage),
                VoyagePriveTable::new(vec![VoyagePriveRow {
                    provider_customer_code: "P".to_string(),
                    salesforce_product_name: "X".to_string(),
                    levels: levels(&[(2, Some(dec(8, 1)), None), (4, Some(dec(1, 0)), None)]),
                }]),
            ),
        )
    }

    fn rates(rebates: &[CalculatedRebate]) -> Vec<(RebateLevel, Decimal, CalculationType)> {
        rebates
            .iter()
            .map(|r| (r.rebate_level, r.rebate_percentage, r.calculation_type))
            .collect()
    }

    #[test]
    fn test_stage_merge_modes() {
        assert_eq!(ResolutionStage::VisaMco.merge_mode(), MergeMode::InsertIfAbsent);
        assert_eq!(ResolutionStage::PartnerPay.merge_mode(), MergeMode::InsertIfAbsent);
        assert_eq!(ResolutionStage::RegionCountry.merge_mode(), MergeMode::Overwrite);
        assert_eq!(ResolutionStage::VoyagePrive.merge_mode(), MergeMode::Overwrite);
    }

    #[test]
    fn test_visa_mco_wins_ties_and_partner_pay_fills_gaps() {
        let rebates = engine(&[], &[]).resolve(&transaction("P"), &tables("P")).unwrap();

        assert_eq!(
            rates(&rebates),
            vec![
                (1, dec(5, 1), CalculationType::VisaMco),
                (2, dec(2, 1), CalculationType::VisaMco),
                (3, dec(3, 1), CalculationType::PartnerPay),
            ]
        );
    }

    #[test]
    fn test_partner_pay_alone() {
        let rebates = engine(&[], &[])
            .resolve(&transaction("Q"), &tables("P"))
            .unwrap();

        assert_eq!(
            rates(&rebates),
            vec![
                (1, dec(9, 1), CalculationType::PartnerPay),
                (3, dec(3, 1), CalculationType::PartnerPay),
            ]
        );
    }

    #[test]
    fn test_region_country_overwrites_supplied_levels_only() {
        let rebates = engine(&["P"], &[])
            .resolve(&transaction("P"), &tables("P"))
            .unwrap();

        assert_eq!(
            rates(&rebates),
            vec![
                (1, dec(5, 1), CalculationType::VisaMco),
                (2, dec(6, 1), CalculationType::RegionCountry),
                (3, dec(3, 1), CalculationType::PartnerPay),
            ]
        );
        assert_eq!(rebates[1].rebate_amount, dec(600, 2));
    }

    #[test]
    fn test_voyage_prive_overwrites_and_adds() {
        let rebates = engine(&[], &["P"])
            .resolve(&transaction("P"), &tables("P"))
            .unwrap();

        assert_eq!(
            rates(&rebates),
            vec![
                (1, dec(5, 1), CalculationType::VisaMco),
                (2, dec(8, 1), CalculationType::VoyagePrive),
                (3, dec(3, 1), CalculationType::PartnerPay),
                (4, dec(1, 0), CalculationType::VoyagePrive),
            ]
        );
    }

    #[test]
    fn test_region_then_voyage_for_overlapping_provider() {
        let engine = PriorityEngine::new(
            MerchantNameEnhancer::new("4511", vec![]),
            RegionCountryResolver::new(
                providers(&["P"]),
                RegionCountryTable::new(vec![RegionCountryRow {
                    provider_customer_code: "P".to_string(),
                    salesforce_product_name: "X".to_string(),
                    region_mc: "EU".to_string(),
                    merchant_country: "*".to_string(),
                    levels: levels(&[(1, Some(dec(9, 1)), None), (2, Some(dec(6, 1)), None)]),
                }]),
            ),
            VoyagePriveResolver::new(
                providers(&["P"]),
                VoyagePriveTable::new(vec![VoyagePriveRow {
                    provider_customer_code: "P".to_string(),
                    salesforce_product_name: "X".to_string(),
                    levels: levels(&[(2, Some(dec(8, 1)), None), (4, Some(dec(1, 0)), None)]),
                }]),
            ),
        );

        let rebates = engine.resolve(&transaction("P"), &tables("P")).unwrap();

        // Voyage-privé wins the level both supply; region keeps the level only it supplies
        assert_eq!(
            rates(&rebates),
            vec![
                (1, dec(9, 1), CalculationType::RegionCountry),
                (2, dec(8, 1), CalculationType::VoyagePrive),
                (3, dec(3, 1), CalculationType::PartnerPay),
                (4, dec(1, 0), CalculationType::VoyagePrive),
            ]
        );
    }

    #[test]
    fn test_zero_override_removes_level() {
        let engine = PriorityEngine::new(
            MerchantNameEnhancer::new("4511", vec![]),
            RegionCountryResolver::new(
                providers(&["P"]),
                RegionCountryTable::new(vec![RegionCountryRow {
                    provider_customer_code: "P".to_string(),
                    salesforce_product_name: "X".to_string(),
                    region_mc: "*".to_string(),
                    merchant_country: "*".to_string(),
                    levels: levels(&[(1, Some(Decimal::ZERO), None)]),
                }]),
            ),
            VoyagePriveResolver::default(),
        );

        let rebates = engine.resolve(&transaction("P"), &tables("P")).unwrap();

        assert!(rebates.iter().all(|r| r.rebate_level != 1));
        assert_eq!(rebates.len(), 2);
    }

    #[test]
    fn test_rebates_carry_enhanced_merchant_name() {
        let rebates = engine(&[], &[]).resolve(&transaction("P"), &tables("P")).unwrap();

        assert!(rebates.iter().all(|r| r.merchant_name == "Lufthansa (LH)"));
        assert!(rebates.iter().all(|r| r.transaction_id == "T1"));
        assert!(rebates.iter().all(|r| r.product_name == "X"));
    }

    #[test]
    fn test_no_match_yields_no_rows() {
        let mut tx = transaction("P");
        tx.salesforce_product_name = "Unknown".to_string();

        let rebates = engine(&["P"], &["P"]).resolve(&tx, &tables("P")).unwrap();
        assert!(rebates.is_empty());
    }

    #[test]
    fn test_missing_transaction_id_is_an_error() {
        let mut tx = transaction("P");
        tx.transaction_id = "  ".to_string();

        let result = engine(&[], &[]).resolve(&tx, &tables("P"));
        assert!(matches!(result, Err(RebateError::InvalidTransaction { .. })));
    }
}
