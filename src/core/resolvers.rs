//! Rule resolvers
//!
//! One resolver per rule source. Each resolver turns a transaction and its
//! rule table into zero or more per-level candidates. A transaction that no
//! rule matches yields an empty candidate list, never an error.
//!
//! Amounts are computed as `round(rate / 100 * amount, 2)` with half-up
//! rounding, independently for the original-currency and EUR amounts.

use super::matchers::{airline_matches, bin_matches, product_matches, provider_matches};
use super::rule_tables::{PartnerPayTable, RegionCountryTable, VisaMcoTable, VoyagePriveTable};
use crate::types::{
    CalculatedRebate, CalculationType, ProviderCode, RebateError, RebateLevel, RebateLevels,
    RegionCountryRow, Transaction,
};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeSet;

/// Decimal places of monetary rebate amounts
const AMOUNT_DECIMAL_PLACES: u32 = 2;

/// Region/country wildcard values (in addition to an exact value match)
const REGION_WILDCARDS: [&str; 2] = ["*", "ALL"];

/// A rate resolved for one level by one rule source
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRebate {
    pub level: RebateLevel,
    pub rate: Decimal,
    pub amount: Decimal,
    pub amount_eur: Decimal,
    pub calculation_type: CalculationType,
}

impl CandidateRebate {
    /// Build a candidate and compute both rebate amounts
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if either amount cannot be represented.
    pub fn new(
        transaction: &Transaction,
        level: RebateLevel,
        rate: Decimal,
        calculation_type: CalculationType,
    ) -> Result<Self, RebateError> {
        Ok(CandidateRebate {
            level,
            rate,
            amount: rebate_amount(rate, transaction.transaction_amount, transaction)?,
            amount_eur: rebate_amount(rate, transaction.transaction_amount_eur, transaction)?,
            calculation_type,
        })
    }

    /// Convert into the output row for this transaction
    pub fn into_rebate(self, transaction: &Transaction, merchant_name: &str) -> CalculatedRebate {
        CalculatedRebate {
            transaction_id: transaction.transaction_id.clone(),
            provider_customer_code: transaction.provider_customer_code.clone(),
            product_name: transaction.salesforce_product_name.clone(),
            merchant_name: merchant_name.to_string(),
            rebate_level: self.level,
            rebate_percentage: self.rate,
            rebate_amount: self.amount,
            rebate_amount_eur: self.amount_eur,
            calculation_type: self.calculation_type,
        }
    }
}

/// `round(rate / 100 * amount, 2)`, half-up
///
/// # Errors
///
/// Returns `ArithmeticOverflow` when the rebate itself exceeds `Decimal` range.
pub fn rebate_amount(
    rate: Decimal,
    amount: Decimal,
    transaction: &Transaction,
) -> Result<Decimal, RebateError> {
    rate.checked_div(Decimal::ONE_HUNDRED)
        .and_then(|fraction| amount.checked_mul(fraction))
        .map(|raw| {
            raw.round_dp_with_strategy(
                AMOUNT_DECIMAL_PLACES,
                RoundingStrategy::MidpointAwayFromZero,
            )
        })
        .ok_or_else(|| RebateError::arithmetic_overflow("rebate amount", &transaction.transaction_id))
}

/// Candidates for every level with a positive effective rate (yearly over monthly)
fn level_candidates(
    transaction: &Transaction,
    levels: &RebateLevels,
    calculation_type: CalculationType,
) -> Result<Vec<CandidateRebate>, RebateError> {
    levels
        .iter()
        .filter_map(|(level, rates)| rates.effective().map(|rate| (level, rate)))
        .map(|(level, rate)| CandidateRebate::new(transaction, level, rate, calculation_type))
        .collect()
}

/// Candidates for the levels an override row supplies a yearly value for
///
/// A zero value still yields a candidate so that it replaces the base level;
/// the zero candidate is dropped when final rows are built. With `existing`,
/// only those levels may be overridden.
fn override_candidates(
    transaction: &Transaction,
    overrides: &RebateLevels,
    calculation_type: CalculationType,
    existing: Option<&BTreeSet<RebateLevel>>,
) -> Result<Vec<CandidateRebate>, RebateError> {
    overrides
        .iter()
        .filter_map(|(level, rates)| rates.yearly.map(|rate| (level, rate)))
        .filter(|(level, _)| existing.map_or(true, |levels| levels.contains(level)))
        .map(|(level, rate)| CandidateRebate::new(transaction, level, rate, calculation_type))
        .collect()
}

/// Levels with a positive Visa/MCO rate for the transaction
fn visa_mco_levels(transaction: &Transaction, table: &VisaMcoTable) -> BTreeSet<RebateLevel> {
    table
        .find(
            &transaction.provider_customer_code,
            &transaction.salesforce_product_name,
        )
        .map(|row| {
            row.levels
                .iter()
                .filter(|(_, rates)| rates.effective().is_some())
                .map(|(level, _)| level)
                .collect()
        })
        .unwrap_or_default()
}

/// Visa/MCO: exact provider and product, one row at most
pub fn resolve_visa_mco(
    transaction: &Transaction,
    table: &VisaMcoTable,
) -> Result<Vec<CandidateRebate>, RebateError> {
    match table.find(
        &transaction.provider_customer_code,
        &transaction.salesforce_product_name,
    ) {
        Some(row) => level_candidates(transaction, &row.levels, CalculationType::VisaMco),
        None => Ok(Vec::new()),
    }
}

/// PartnerPay: first row where provider, product, BIN, and airline all match
///
/// The airline is compared with the raw merchant name, never the enhanced one.
pub fn resolve_partner_pay(
    transaction: &Transaction,
    table: &PartnerPayTable,
) -> Result<Vec<CandidateRebate>, RebateError> {
    let matched = table
        .candidates(&transaction.salesforce_product_name)
        .find(|row| {
            provider_matches(&row.provider_customer_code, &transaction.provider_customer_code)
                && product_matches(
                    &row.salesforce_product_name,
                    &transaction.salesforce_product_name,
                )
                && bin_matches(&row.partner_pay_bin, &transaction.bin_card_number)
                && airline_matches(&row.partner_pay_airline, &transaction.merchant_name)
        });

    match matched {
        Some(row) => level_candidates(transaction, &row.levels, CalculationType::PartnerPay),
        None => Ok(Vec::new()),
    }
}

/// Region/country overrides for a configured set of providers
#[derive(Debug, Clone, Default)]
pub struct RegionCountryResolver {
    providers: BTreeSet<ProviderCode>,
    table: RegionCountryTable,
}

impl RegionCountryResolver {
    pub fn new(providers: BTreeSet<ProviderCode>, table: RegionCountryTable) -> Self {
        RegionCountryResolver { providers, table }
    }

    /// Whether this resolver takes part for the provider
    fn applies_to(&self, provider: &str) -> bool {
        self.providers.contains(provider)
    }

    /// The region rule for the transaction
    ///
    /// An exact `(region_mc, merchant_country)` match wins over any wildcard
    /// match; within each pass the first row in source order wins.
    pub fn find_rule(&self, transaction: &Transaction) -> Option<&RegionCountryRow> {
        let region = transaction.region_mc.as_str();
        let country = transaction.transaction_merchant_country.as_str();

        let provider = transaction.provider_customer_code.as_str();
        let product = transaction.salesforce_product_name.as_str();

        self.table
            .rules_for(provider, product)
            .find(|rule| rule.region_mc == region && rule.merchant_country == country)
            .or_else(|| {
                self.table.rules_for(provider, product).find(|rule| {
                    region_field_matches(&rule.region_mc, region)
                        && region_field_matches(&rule.merchant_country, country)
                })
            })
    }

    /// Region/country override candidates for the transaction
    ///
    /// Only levels the Visa/MCO row already has are overridden, and only those
    /// the region rule supplies a yearly value for. Providers outside the
    /// configured set, and transactions without a matching region rule, get
    /// no candidates.
    pub fn resolve(
        &self,
        transaction: &Transaction,
        visa_mco: &VisaMcoTable,
    ) -> Result<Vec<CandidateRebate>, RebateError> {
        if !self.applies_to(&transaction.provider_customer_code) {
            return Ok(Vec::new());
        }
        match self.find_rule(transaction) {
            Some(rule) => override_candidates(
                transaction,
                &rule.levels,
                CalculationType::RegionCountry,
                Some(&visa_mco_levels(transaction, visa_mco)),
            ),
            None => Ok(Vec::new()),
        }
    }
}

fn region_field_matches(rule_value: &str, transaction_value: &str) -> bool {
    REGION_WILDCARDS
        .iter()
        .any(|wildcard| rule_value.eq_ignore_ascii_case(wildcard))
        || rule_value == transaction_value
}

/// Voyage-privé overrides for a configured set of providers
#[derive(Debug, Clone, Default)]
pub struct VoyagePriveResolver {
    providers: BTreeSet<ProviderCode>,
    table: VoyagePriveTable,
}

impl VoyagePriveResolver {
    pub fn new(providers: BTreeSet<ProviderCode>, table: VoyagePriveTable) -> Self {
        VoyagePriveResolver { providers, table }
    }

    fn applies_to(&self, provider: &str) -> bool {
        self.providers.contains(provider)
    }

    /// Voyage-privé override candidates for the transaction
    ///
    /// Unlike region/country, every level the row supplies is returned, so
    /// levels missing from the Visa/MCO base are added.
    pub fn resolve(&self, transaction: &Transaction) -> Result<Vec<CandidateRebate>, RebateError> {
        if !self.applies_to(&transaction.provider_customer_code) {
            return Ok(Vec::new());
        }
        match self.table.find(
            &transaction.provider_customer_code,
            &transaction.salesforce_product_name,
        ) {
            Some(row) => {
                override_candidates(transaction, &row.levels, CalculationType::VoyagePrive, None)
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LevelRate, PartnerPayRow, VisaMcoRow, VoyagePriveRow};
    use rstest::rstest;

    fn dec(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    fn transaction(provider: &str, product: &str) -> Transaction {
        Transaction {
            transaction_id: "T1".to_string(),
            provider_customer_code: provider.to_string(),
            salesforce_product_name: product.to_string(),
            bin_card_number: "557062xxxxxx".to_string(),
            merchant_name: "AIR FRANCE".to_string(),
            transaction_merchant_category_code: "4511".to_string(),
            transaction_amount: dec(100000, 2),
            transaction_amount_eur: dec(100000, 2),
            region_mc: "EU".to_string(),
            transaction_merchant_country: "FR".to_string(),
            ..Default::default()
        }
    }

    /// Level 1: yearly 0.5 / monthly 0.3, level 2: monthly 0.2, level 3: yearly 0 / monthly 0.1
    fn example_levels() -> RebateLevels {
        let mut levels = RebateLevels::default();
        levels.set(1, LevelRate::new(Some(dec(5, 1)), Some(dec(3, 1))));
        levels.set(2, LevelRate::new(None, Some(dec(2, 1))));
        levels.set(3, LevelRate::new(Some(Decimal::ZERO), Some(dec(1, 1))));
        levels
    }

    fn visa_table(provider: &str, product: &str, levels: RebateLevels) -> VisaMcoTable {
        VisaMcoTable::new(vec![VisaMcoRow {
            provider_customer_code: provider.to_string(),
            salesforce_product_name: product.to_string(),
            levels,
        }])
    }

    fn partner_pay_row(provider: &str, bin: &str, airline: &str) -> PartnerPayRow {
        let mut levels = RebateLevels::default();
        levels.set(1, LevelRate::new(None, Some(dec(7, 1))));
        PartnerPayRow {
            provider_customer_code: provider.to_string(),
            salesforce_product_name: "X".to_string(),
            partner_pay_bin: bin.to_string(),
            partner_pay_airline: airline.to_string(),
            levels,
        }
    }

    fn region_row(region: &str, country: &str, level1: Option<Decimal>) -> RegionCountryRow {
        let mut levels = RebateLevels::default();
        levels.set(1, LevelRate::new(level1, None));
        RegionCountryRow {
            provider_customer_code: "P".to_string(),
            salesforce_product_name: "X".to_string(),
            region_mc: region.to_string(),
            merchant_country: country.to_string(),
            levels,
        }
    }

    fn providers(codes: &[&str]) -> BTreeSet<ProviderCode> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[rstest]
    #[case::round_half_up(dec(5, 1), dec(101, 2), dec(1, 2))]
    #[case::plain(dec(5, 1), dec(100000, 2), dec(500, 2))]
    #[case::midpoint(dec(25, 1), dec(2, 1), dec(1, 2))]
    #[case::midpoint_up(dec(5, 0), dec(21, 1), dec(11, 2))]
    #[case::negative_amount(dec(5, 0), dec(-21, 1), dec(-11, 2))]
    fn test_rebate_amount_rounding(
        #[case] rate: Decimal,
        #[case] amount: Decimal,
        #[case] expected: Decimal,
    ) {
        let tx = transaction("P", "X");
        assert_eq!(rebate_amount(rate, amount, &tx).unwrap(), expected);
    }

    #[test]
    fn test_rebate_amount_overflow() {
        let tx = transaction("P", "X");
        let result = rebate_amount(Decimal::MAX, Decimal::MAX, &tx);
        assert!(matches!(result, Err(RebateError::ArithmeticOverflow { .. })));
    }

    #[test]
    fn test_rebate_amount_scales_rate_before_amount() {
        let tx = transaction("P", "X");
        let amount = Decimal::MAX / Decimal::TWO;

        // amount * 150 alone is out of range, the 150% rebate is not
        let rebate = rebate_amount(dec(150, 0), amount, &tx).unwrap();
        assert!(rebate > amount);
    }

    #[test]
    fn test_visa_mco_example_scenario() {
        let tx = transaction("P", "X");
        let table = visa_table("P", "X", example_levels());

        let candidates = resolve_visa_mco(&tx, &table).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].level, 1);
        assert_eq!(candidates[0].rate, dec(5, 1));
        assert_eq!(candidates[0].amount, dec(500, 2));
        assert_eq!(candidates[1].level, 2);
        assert_eq!(candidates[1].rate, dec(2, 1));
        assert_eq!(candidates[1].amount, dec(200, 2));
        assert!(candidates
            .iter()
            .all(|c| c.calculation_type == CalculationType::VisaMco));
    }

    #[test]
    fn test_visa_mco_amounts_are_independent() {
        let mut tx = transaction("P", "X");
        tx.transaction_amount = dec(110000, 2);
        tx.transaction_amount_eur = dec(100000, 2);
        let table = visa_table("P", "X", example_levels());

        let candidates = resolve_visa_mco(&tx, &table).unwrap();

        assert_eq!(candidates[0].amount, dec(550, 2));
        assert_eq!(candidates[0].amount_eur, dec(500, 2));
    }

    #[test]
    fn test_visa_mco_no_match_is_empty() {
        let tx = transaction("P", "Other");
        let table = visa_table("P", "X", example_levels());
        assert!(resolve_visa_mco(&tx, &table).unwrap().is_empty());
    }

    #[rstest]
    #[case::all_keys_match("P", "Tier 1: 557062", "AIR FRANCE", true)]
    #[case::wildcard_provider("partnerpay", "Tier 1: 557062", "AIR FRANCE", true)]
    #[case::case_insensitive_provider("p", "557062", "AIR FRANCE", true)]
    #[case::wrong_bin("P", "Tier 1: 411111", "AIR FRANCE", false)]
    #[case::wrong_airline("P", "Tier 1: 557062", "KLM", false)]
    #[case::enhanced_airline_label("P", "Tier 1: 557062", "Air France (AF)", false)]
    #[case::wrong_provider("Q", "Tier 1: 557062", "AIR FRANCE", false)]
    fn test_partner_pay_requires_all_keys(
        #[case] provider: &str,
        #[case] bin: &str,
        #[case] airline: &str,
        #[case] matches: bool,
    ) {
        let tx = transaction("P", "X");
        let table = PartnerPayTable::new(vec![partner_pay_row(provider, bin, airline)]);

        let candidates = resolve_partner_pay(&tx, &table).unwrap();

        assert_eq!(!candidates.is_empty(), matches);
        if matches {
            assert_eq!(candidates[0].rate, dec(7, 1));
            assert_eq!(candidates[0].amount, dec(700, 2));
            assert_eq!(candidates[0].calculation_type, CalculationType::PartnerPay);
        }
    }

    #[test]
    fn test_partner_pay_first_matching_row_wins() {
        let tx = transaction("P", "X");
        let mut second = partner_pay_row("P", "557062", "AIR FRANCE");
        second.levels.set(1, LevelRate::yearly(dec(9, 1)));
        let table = PartnerPayTable::new(vec![
            partner_pay_row("P", "411111", "AIR FRANCE"),
            partner_pay_row("P", "557062", "AIR FRANCE"),
            second,
        ]);

        let candidates = resolve_partner_pay(&tx, &table).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rate, dec(7, 1));
    }

    #[rstest]
    #[case::exact_beats_wildcard(vec![region_row("*", "*", Some(dec(9, 1))), region_row("EU", "FR", Some(dec(8, 1)))], Some(dec(8, 1)))]
    #[case::wildcard_star(vec![region_row("EU", "*", Some(dec(9, 1)))], Some(dec(9, 1)))]
    #[case::wildcard_all(vec![region_row("ALL", "FR", Some(dec(9, 1)))], Some(dec(9, 1)))]
    #[case::other_country(vec![region_row("EU", "DE", Some(dec(9, 1)))], None)]
    fn test_region_rule_selection(
        #[case] rows: Vec<RegionCountryRow>,
        #[case] expected_level1: Option<Decimal>,
    ) {
        let resolver = RegionCountryResolver::new(providers(&["P"]), RegionCountryTable::new(rows));
        let tx = transaction("P", "X");

        let rule = resolver.find_rule(&tx);
        assert_eq!(rule.and_then(|r| r.levels.get(1).yearly), expected_level1);
    }

    #[test]
    fn test_region_override_supplies_only_rule_levels() {
        let resolver = RegionCountryResolver::new(
            providers(&["P"]),
            RegionCountryTable::new(vec![region_row("EU", "FR", Some(dec(9, 1)))]),
        );
        let tx = transaction("P", "X");

        let candidates = resolver
            .resolve(&tx, &visa_table("P", "X", example_levels()))
            .unwrap();

        // Level 2 has no rule value and is left to the Visa/MCO stage
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].level, 1);
        assert_eq!(candidates[0].rate, dec(9, 1));
        assert_eq!(candidates[0].amount, dec(900, 2));
        assert_eq!(candidates[0].calculation_type, CalculationType::RegionCountry);
    }

    #[test]
    fn test_region_override_does_not_add_levels() {
        let mut row = region_row("EU", "FR", None);
        row.levels.set(2, LevelRate::yearly(dec(7, 1)));
        row.levels.set(5, LevelRate::yearly(dec(1, 0)));
        let resolver =
            RegionCountryResolver::new(providers(&["P"]), RegionCountryTable::new(vec![row]));
        let tx = transaction("P", "X");

        let candidates = resolver
            .resolve(&tx, &visa_table("P", "X", example_levels()))
            .unwrap();

        let levels: Vec<_> = candidates.iter().map(|c| c.level).collect();
        assert_eq!(levels, vec![2]);
    }

    #[test]
    fn test_region_override_without_visa_mco_row_is_empty() {
        let resolver = RegionCountryResolver::new(
            providers(&["P"]),
            RegionCountryTable::new(vec![region_row("EU", "FR", Some(dec(9, 1)))]),
        );
        let tx = transaction("P", "X");

        let candidates = resolver.resolve(&tx, &VisaMcoTable::default()).unwrap();

        assert!(candidates.is_empty());
    }

    #[test]
    fn test_region_zero_override_replaces_base() {
        let resolver = RegionCountryResolver::new(
            providers(&["P"]),
            RegionCountryTable::new(vec![region_row("EU", "FR", Some(Decimal::ZERO))]),
        );
        let tx = transaction("P", "X");

        let candidates = resolver
            .resolve(&tx, &visa_table("P", "X", example_levels()))
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].level, 1);
        assert_eq!(candidates[0].rate, Decimal::ZERO);
        assert_eq!(candidates[0].calculation_type, CalculationType::RegionCountry);
    }

    #[rstest]
    #[case::other_provider(&["OTHER"], "EU")]
    #[case::no_region_rule(&["P"], "APAC")]
    fn test_region_resolver_without_override_is_empty(
        #[case] configured: &[&str],
        #[case] region: &str,
    ) {
        let resolver = RegionCountryResolver::new(
            providers(configured),
            RegionCountryTable::new(vec![region_row("EU", "FR", Some(dec(9, 1)))]),
        );
        let mut tx = transaction("P", "X");
        tx.region_mc = region.to_string();

        let candidates = resolver
            .resolve(&tx, &visa_table("P", "X", example_levels()))
            .unwrap();

        assert!(candidates.is_empty());
    }

    #[test]
    fn test_voyage_prive_overrides_and_adds_levels() {
        let mut levels = RebateLevels::default();
        levels.set(2, LevelRate::yearly(dec(4, 1)));
        levels.set(6, LevelRate::yearly(dec(1, 0)));
        let resolver = VoyagePriveResolver::new(
            providers(&["P"]),
            VoyagePriveTable::new(vec![VoyagePriveRow {
                provider_customer_code: "P".to_string(),
                salesforce_product_name: "X".to_string(),
                levels,
            }]),
        );
        let tx = transaction("P", "X");

        let candidates = resolver.resolve(&tx).unwrap();

        let summary: Vec<_> = candidates
            .iter()
            .map(|c| (c.level, c.rate, c.calculation_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                (2, dec(4, 1), CalculationType::VoyagePrive),
                (6, dec(1, 0), CalculationType::VoyagePrive),
            ]
        );
    }

    #[test]
    fn test_voyage_prive_without_rule_is_empty() {
        let resolver = VoyagePriveResolver::new(providers(&["P"]), VoyagePriveTable::default());
        let tx = transaction("P", "X");

        assert!(resolver.resolve(&tx).unwrap().is_empty());
    }
}
