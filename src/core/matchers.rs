//! Key matching predicates shared by the rule resolvers
//!
//! Source tables disagree on casing and on how BINs are labelled, so PartnerPay
//! rows are matched with a few flexible predicates. All functions here are pure.

use regex::Regex;
use std::sync::OnceLock;

/// Rule-side provider value that matches any transaction provider
///
/// Compatibility shim for PartnerPay exports whose provider column was
/// overwritten with the program name.
pub const PROVIDER_WILDCARD: &str = "partnerpay";

/// Number of leading BIN digits that take part in matching
pub const BIN_LENGTH: usize = 6;

/// Six digits after a colon, e.g. `"Tier 1: 557062"`
fn colon_bin_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r":\s*(\d{6})").expect("valid BIN pattern"))
}

/// Six digits at the end of the label, e.g. `"PP BIN 557062"`
fn trailing_bin_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{6})\s*$").expect("valid BIN pattern"))
}

/// First run of six digits anywhere in the label
fn any_bin_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{6})").expect("valid BIN pattern"))
}

/// Provider match: exact, case-insensitive, or the rule wildcard
pub fn provider_matches(rule_provider: &str, transaction_provider: &str) -> bool {
    rule_provider == transaction_provider
        || rule_provider.to_lowercase() == transaction_provider.to_lowercase()
        || rule_provider == PROVIDER_WILDCARD
}

/// Product match: exact only
///
/// Tiered product names ("Partner Pay 150" vs "Partner Pay 100") are
/// different products.
pub fn product_matches(rule_product: &str, transaction_product: &str) -> bool {
    rule_product == transaction_product
}

/// Extract the 6-digit BIN from a rule-side label
///
/// Tries, in order: six digits at the end of the label, six digits after a
/// colon, the first six-digit run, and finally all digits of the label.
pub fn extract_rule_bin(label: &str) -> String {
    [trailing_bin_pattern(), colon_bin_pattern(), any_bin_pattern()]
        .iter()
        .find_map(|pattern| pattern.captures(label))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| label.chars().filter(char::is_ascii_digit).collect())
}

/// Reduce a transaction BIN to its leading 6 digits
///
/// Non-digit characters (masking, separators) are dropped first.
pub fn transaction_bin_prefix(bin: &str) -> String {
    bin.chars()
        .filter(char::is_ascii_digit)
        .take(BIN_LENGTH)
        .collect()
}

/// BIN match between a rule label and a transaction BIN
///
/// Matches when the transaction BIN starts with the rule BIN, when the rule
/// label contains the transaction's 6-digit prefix, or when both 6-digit
/// values are equal. Either side empty never matches.
pub fn bin_matches(rule_bin_label: &str, transaction_bin: &str) -> bool {
    let rule_bin = extract_rule_bin(rule_bin_label);
    let transaction_prefix = transaction_bin_prefix(transaction_bin);
    if rule_bin.is_empty() || transaction_prefix.is_empty() {
        return false;
    }

    let transaction_digits: String = transaction_bin.chars().filter(char::is_ascii_digit).collect();

    transaction_digits.starts_with(&rule_bin)
        || rule_bin_label.contains(&transaction_prefix)
        || rule_bin == transaction_prefix
}

/// Airline match against the raw (non-enhanced) merchant name
pub fn airline_matches(rule_airline: &str, raw_merchant_name: &str) -> bool {
    rule_airline == raw_merchant_name
}
