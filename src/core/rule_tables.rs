//! Indexed rule tables
//!
//! Rule rows are loaded once per run and only read afterwards. Each table
//! keeps its rows in source order plus a HashMap index on the exact-match keys
//! so per-transaction lookups do not scan the whole table.
//!
//! # Duplicate Handling
//!
//! When several rows share the same exact key, the first row in source order
//! wins. Subsequent duplicates are kept in `rows` but are never returned by
//! single-row lookups.

use crate::types::{PartnerPayRow, RegionCountryRow, VisaMcoRow, VoyagePriveRow};
use std::collections::HashMap;

type ExactKey = (String, String);

fn exact_key(provider: &str, product: &str) -> ExactKey {
    (provider.to_string(), product.to_string())
}

/// Visa/MCO rules indexed by exact (provider, product)
#[derive(Debug, Clone, Default)]
pub struct VisaMcoTable {
    rows: Vec<VisaMcoRow>,
    index: HashMap<ExactKey, usize>,
}

impl VisaMcoTable {
    pub fn new(rows: Vec<VisaMcoRow>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            // Only store if not already present (first occurrence wins)
            index
                .entry(exact_key(
                    &row.provider_customer_code,
                    &row.salesforce_product_name,
                ))
                .or_insert(position);
        }
        VisaMcoTable { rows, index }
    }

    /// The rule for this exact provider and product, if any
    pub fn find(&self, provider: &str, product: &str) -> Option<&VisaMcoRow> {
        self.index
            .get(&exact_key(provider, product))
            .and_then(|&position| self.rows.get(position))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// PartnerPay rules indexed by product
///
/// Provider matching is flexible (case-insensitive and wildcard) so only the
/// exact product key can be indexed. Rows for a product stay in source order.
#[derive(Debug, Clone, Default)]
pub struct PartnerPayTable {
    rows: Vec<PartnerPayRow>,
    by_product: HashMap<String, Vec<usize>>,
}

impl PartnerPayTable {
    pub fn new(rows: Vec<PartnerPayRow>) -> Self {
        let mut by_product: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, row) in rows.iter().enumerate() {
            by_product
                .entry(row.salesforce_product_name.clone())
                .or_default()
                .push(position);
        }
        PartnerPayTable { rows, by_product }
    }

    /// Rows whose product equals `product`, in source order
    pub fn candidates<'a>(&'a self, product: &str) -> impl Iterator<Item = &'a PartnerPayRow> + 'a {
        self.by_product
            .get(product)
            .into_iter()
            .flatten()
            .filter_map(move |&position| self.rows.get(position))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Region/country rules grouped by exact (provider, product)
#[derive(Debug, Clone, Default)]
pub struct RegionCountryTable {
    rows: Vec<RegionCountryRow>,
    index: HashMap<ExactKey, Vec<usize>>,
}

impl RegionCountryTable {
    pub fn new(rows: Vec<RegionCountryRow>) -> Self {
        let mut index: HashMap<ExactKey, Vec<usize>> = HashMap::new();
        for (position, row) in rows.iter().enumerate() {
            index
                .entry(exact_key(
                    &row.provider_customer_code,
                    &row.salesforce_product_name,
                ))
                .or_default()
                .push(position);
        }
        RegionCountryTable { rows, index }
    }

    /// All region rows for this provider and product, in source order
    pub fn rules_for<'a>(
        &'a self,
        provider: &str,
        product: &str,
    ) -> impl Iterator<Item = &'a RegionCountryRow> + 'a {
        self.index
            .get(&exact_key(provider, product))
            .into_iter()
            .flatten()
            .filter_map(move |&position| self.rows.get(position))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Voyage-privé rules indexed by exact (provider, product)
#[derive(Debug, Clone, Default)]
pub struct VoyagePriveTable {
    rows: Vec<VoyagePriveRow>,
    index: HashMap<ExactKey, usize>,
}

impl VoyagePriveTable {
    pub fn new(rows: Vec<VoyagePriveRow>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            index
                .entry(exact_key(
                    &row.provider_customer_code,
                    &row.salesforce_product_name,
                ))
                .or_insert(position);
        }
        VoyagePriveTable { rows, index }
    }

    pub fn find(&self, provider: &str, product: &str) -> Option<&VoyagePriveRow> {
        self.index
            .get(&exact_key(provider, product))
            .and_then(|&position| self.rows.get(position))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The two base tables every transaction is matched against
///
/// Built once per run and shared read-only by all workers.
#[derive(Debug, Clone, Default)]
pub struct BaseTables {
    pub visa_mco: VisaMcoTable,
    pub partner_pay: PartnerPayTable,
}

impl BaseTables {
    pub fn new(visa_mco: Vec<VisaMcoRow>, partner_pay: Vec<PartnerPayRow>) -> Self {
        BaseTables {
            visa_mco: VisaMcoTable::new(visa_mco),
            partner_pay: PartnerPayTable::new(partner_pay),
        }
    }
}
