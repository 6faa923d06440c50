//! Rebate rule table types
//!
//! Every rule source carries up to eight rebate levels. Each level is stored
//! in a fixed slot of [`RebateLevels`] and iterated by index.

use rust_decimal::Decimal;

/// Number of rebate levels carried by every rule row
pub const REBATE_LEVEL_COUNT: usize = 8;

/// One-based rebate level (1-8)
pub type RebateLevel = u8;

/// Rates configured for a single rebate level
///
/// `monthly` is only populated for Visa/MCO and PartnerPay rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelRate {
    /// Yearly rate in percent, authoritative when present
    pub yearly: Option<Decimal>,

    /// Monthly rate in percent, used only when `yearly` is absent
    pub monthly: Option<Decimal>,
}

impl LevelRate {
    /// Create a level carrying both rate sources
    pub fn new(yearly: Option<Decimal>, monthly: Option<Decimal>) -> Self {
        LevelRate { yearly, monthly }
    }

    /// Create a yearly-only level
    pub fn yearly(rate: Decimal) -> Self {
        LevelRate {
            yearly: Some(rate),
            monthly: None,
        }
    }

    /// Resolve the rate that applies to this level
    ///
    /// Yearly wins whenever it is present, even when it is zero. The resolved
    /// rate must be strictly positive to apply.
    ///
    /// # Returns
    ///
    /// * `Some(rate)` - The applicable rate in percent
    /// * `None` - No positive rate applies at this level
    pub fn effective(&self) -> Option<Decimal> {
        let rate = self.yearly.or(self.monthly)?;
        (rate > Decimal::ZERO).then_some(rate)
    }
}

/// Fixed-size set of eight rebate levels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebateLevels([LevelRate; REBATE_LEVEL_COUNT]);

impl RebateLevels {
    /// Create a level set from eight slots (slot 0 is level 1)
    pub fn new(levels: [LevelRate; REBATE_LEVEL_COUNT]) -> Self {
        RebateLevels(levels)
    }

    /// Create a level set from yearly rates only
    pub fn from_yearly(rates: [Option<Decimal>; REBATE_LEVEL_COUNT]) -> Self {
        RebateLevels(rates.map(|yearly| LevelRate {
            yearly,
            monthly: None,
        }))
    }

    /// Get the rates for a one-based level
    ///
    /// Levels outside 1-8 return an empty `LevelRate`.
    pub fn get(&self, level: RebateLevel) -> LevelRate {
        level
            .checked_sub(1)
            .and_then(|index| self.0.get(usize::from(index)))
            .copied()
            .unwrap_or_default()
    }

    /// Set the rates for a one-based level, ignoring levels outside 1-8
    pub fn set(&mut self, level: RebateLevel, rate: LevelRate) {
        if let Some(slot) = level
            .checked_sub(1)
            .and_then(|index| self.0.get_mut(usize::from(index)))
        {
            *slot = rate;
        }
    }

    /// Iterate over `(level, rates)` pairs in level order
    pub fn iter(&self) -> impl Iterator<Item = (RebateLevel, &LevelRate)> {
        (1..=REBATE_LEVEL_COUNT as RebateLevel).zip(self.0.iter())
    }
}

/// Visa/MCO rebate rule, keyed by provider and product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisaMcoRow {
    pub provider_customer_code: String,
    pub salesforce_product_name: String,
    pub levels: RebateLevels,
}

/// PartnerPay rebate rule
///
/// Matched on provider, product, BIN label, and airline (raw merchant name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartnerPayRow {
    pub provider_customer_code: String,
    pub salesforce_product_name: String,

    /// BIN label such as `"Tier 1: 557062"`
    pub partner_pay_bin: String,

    /// Airline label compared against the raw merchant name
    pub partner_pay_airline: String,

    pub levels: RebateLevels,
}

/// Region/country override rule (yearly rates only)
///
/// `region_mc` and `merchant_country` accept the wildcards `*` and `ALL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCountryRow {
    pub provider_customer_code: String,
    pub salesforce_product_name: String,
    pub region_mc: String,
    pub merchant_country: String,
    pub levels: RebateLevels,
}

/// Voyage-privé override rule (yearly rates only)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoyagePriveRow {
    pub provider_customer_code: String,
    pub salesforce_product_name: String,
    pub levels: RebateLevels,
}

/// Airline reference entry used to build display names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirlineEntry {
    /// Airline name, matched as a case-insensitive substring
    pub name: String,

    /// IATA code shown in the display name
    pub code: String,
}

impl AirlineEntry {
    pub fn new(name: &str, code: &str) -> Self {
        AirlineEntry {
            name: name.to_string(),
            code: code.to_string(),
        }
    }
}
