//! Merchant display-name enhancement
//!
//! Airline ticketing transactions often carry truncated or acquirer-specific
//! merchant names. For the airline MCC the enhancer resolves a canonical
//! `"Airline Name (CODE)"` label. The result is for display only; PartnerPay
//! matching keeps using the raw merchant name.

use crate::types::{AirlineEntry, Transaction};

/// Substring fallbacks used when the reference table has no match
///
/// These cover merchant names seen before the airline table existed.
const FALLBACK_AIRLINES: &[(&str, &str)] = &[
    ("air france", "Air France (AF)"),
    ("klm", "KLM (KL)"),
    ("transavia", "Transavia (TO)"),
    ("hop!", "HOP! (A5)"),
];

/// Resolves display names for airline transactions
#[derive(Debug, Clone)]
pub struct MerchantNameEnhancer {
    airline_mcc: String,
    /// Reference entries with lowercased names, in table order
    airlines: Vec<(String, AirlineEntry)>,
}

impl MerchantNameEnhancer {
    /// Create an enhancer for the given MCC and airline reference table
    pub fn new(airline_mcc: &str, airlines: Vec<AirlineEntry>) -> Self {
        let airlines = airlines
            .into_iter()
            .filter(|entry| !entry.name.trim().is_empty())
            .map(|entry| (entry.name.to_lowercase(), entry))
            .collect();
        MerchantNameEnhancer {
            airline_mcc: airline_mcc.trim().to_string(),
            airlines,
        }
    }

    /// Display name for the transaction's merchant
    ///
    /// Non-airline MCCs, and airline transactions that match neither the table
    /// nor a fallback, keep their raw merchant name.
    pub fn enhance(&self, transaction: &Transaction) -> String {
        if transaction.transaction_merchant_category_code.trim() != self.airline_mcc {
            return transaction.merchant_name.clone();
        }

        let merchant = transaction.merchant_name.to_lowercase();
        let legal = transaction
            .merchant_legal_name
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        let mentions = |needle: &str| merchant.contains(needle) || legal.contains(needle);

        if let Some((_, entry)) = self.airlines.iter().find(|(name, _)| mentions(name.as_str())) {
            return format!("{} ({})", entry.name, entry.code);
        }

        FALLBACK_AIRLINES
            .iter()
            .find(|&&(needle, _)| mentions(needle))
            .map(|&(_, label)| label.to_string())
            .unwrap_or_else(|| transaction.merchant_name.clone())
    }
}
