//! Transaction-related types for the rebate engine
//!
//! Transactions are produced by the ingestion layer (see `io::csv_format`) and
//! are treated as read-only for the whole calculation run.

use rust_decimal::Decimal;

/// Transaction identifier, unique within one batch
pub type TransactionId = String;

/// Provider customer code used as the primary rule key
pub type ProviderCode = String;

/// A normalized payment transaction
///
/// Carries the matching keys used by the rule resolvers and the two amounts
/// that are rebated independently (original currency and EUR).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transaction {
    /// Unique transaction identifier
    pub transaction_id: TransactionId,

    /// Provider customer code (rule key)
    pub provider_customer_code: ProviderCode,

    /// Product name as known in the sales system (rule key, exact match)
    pub salesforce_product_name: String,

    /// Card BIN, possibly masked (e.g. `557062xxxxxx`)
    ///
    /// Only the leading 6 digits take part in matching.
    pub bin_card_number: String,

    /// Raw merchant name as reported by the acquirer
    ///
    /// PartnerPay airline matching always uses this value, never the
    /// enhanced display name.
    pub merchant_name: String,

    /// Secondary merchant name field (legal or DBA name), when available
    pub merchant_legal_name: Option<String>,

    /// Merchant category code (MCC)
    pub transaction_merchant_category_code: String,

    /// Amount in the original transaction currency
    pub transaction_amount: Decimal,

    /// Amount converted to EUR
    pub transaction_amount_eur: Decimal,

    /// Business region of the transaction
    pub region: String,

    /// Card-scheme region, used for region-country rule matching
    pub region_mc: String,

    /// Merchant country, used for region-country rule matching
    pub transaction_merchant_country: String,
}
