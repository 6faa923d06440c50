//! CSV format handling for transactions, rule tables, and rebate export
//!
//! This module centralizes all CSV format concerns, providing:
//! - `CsvTransactionRecord` for serde deserialization and its conversion
//! - Header-indexed parsing of the rule and airline tables
//! - Rebate export serialization
//!
//! Nothing here opens files; readers are passed in, which keeps every
//! function testable over in-memory bytes.

use crate::types::{
    AirlineEntry, LevelRate, PartnerPayRow, RebateError, RebateLevels, RegionCountryRow,
    StoredRebate, Transaction, VisaMcoRow, VoyagePriveRow, REBATE_LEVEL_COUNT,
};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::str::FromStr;
use tracing::warn;

/// Export columns, in order
pub const EXPORT_HEADERS: [&str; 10] = [
    "id",
    "transaction_id",
    "provider_customer_code",
    "product_name",
    "merchant_name",
    "rebate_level",
    "rebate_percentage",
    "rebate_amount",
    "rebate_amount_eur",
    "calculation_type",
];

/// CSV record structure for transaction deserialization
///
/// Amounts stay strings here so that conversion can report the offending
/// value. Missing columns deserialize as empty values.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CsvTransactionRecord {
    pub transaction_id: String,
    pub provider_customer_code: String,
    pub salesforce_product_name: String,
    pub bin_card_number: String,
    pub merchant_name: String,
    pub merchant_legal_name: Option<String>,
    pub transaction_merchant_category_code: String,
    pub transaction_amount: String,
    pub transaction_amount_eur: String,
    pub region: String,
    pub region_mc: String,
    pub transaction_merchant_country: String,
}

/// Parse a decimal field, reporting the field name on failure
fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RebateError> {
    Decimal::from_str(value.trim()).map_err(|_| RebateError::invalid_field(field, value))
}

/// Convert a CsvTransactionRecord to a Transaction
///
/// Both amounts are required. A blank legal name becomes `None`.
///
/// # Errors
///
/// Returns `InvalidField` for a blank or malformed amount.
pub fn convert_transaction_record(record: CsvTransactionRecord) -> Result<Transaction, RebateError> {
    let transaction_amount = parse_decimal("transaction_amount", &record.transaction_amount)?;
    let transaction_amount_eur =
        parse_decimal("transaction_amount_eur", &record.transaction_amount_eur)?;

    Ok(Transaction {
        transaction_id: record.transaction_id,
        provider_customer_code: record.provider_customer_code,
        salesforce_product_name: record.salesforce_product_name,
        bin_card_number: record.bin_card_number,
        merchant_name: record.merchant_name,
        merchant_legal_name: record
            .merchant_legal_name
            .filter(|name| !name.trim().is_empty()),
        transaction_merchant_category_code: record.transaction_merchant_category_code,
        transaction_amount,
        transaction_amount_eur,
        region: record.region,
        region_mc: record.region_mc,
        transaction_merchant_country: record.transaction_merchant_country,
    })
}

/// Attach a 1-based input line to a row error
///
/// Errors that already carry a line (csv parse errors) are returned unchanged.
pub fn with_line(line: u64, error: RebateError) -> RebateError {
    match error {
        RebateError::ParseError { line: Some(_), .. } => error,
        RebateError::ParseError { line: None, message } => RebateError::ParseError {
            line: Some(line),
            message,
        },
        other => RebateError::ParseError {
            line: Some(line),
            message: other.to_string(),
        },
    }
}

/// Column positions of a table, looked up by header name
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(position, name)| (name.trim().to_string(), position))
            .collect();
        HeaderIndex { positions }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Trimmed cell value, `None` for a missing column or blank cell
    pub fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        let position = *self.positions.get(column)?;
        record
            .get(position)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Cell value as an owned string, empty when absent
    pub fn text(&self, record: &StringRecord, column: &str) -> String {
        self.get(record, column).unwrap_or_default().to_string()
    }

    /// Optional decimal cell
    pub fn decimal(
        &self,
        record: &StringRecord,
        column: &str,
    ) -> Result<Option<Decimal>, RebateError> {
        self.get(record, column)
            .map(|value| parse_decimal(column, value))
            .transpose()
    }
}

fn yearly_column(level: usize) -> String {
    format!("rebate_{}_yearly", level)
}

fn monthly_column(level: usize) -> String {
    format!("rebate_{}_monthly", level)
}

/// Read the eight level columns; monthly columns only when `with_monthly`
fn parse_levels(
    index: &HeaderIndex,
    record: &StringRecord,
    with_monthly: bool,
) -> Result<RebateLevels, RebateError> {
    let mut levels = RebateLevels::default();
    for level in 1..=REBATE_LEVEL_COUNT {
        let yearly = index.decimal(record, &yearly_column(level))?;
        let monthly = if with_monthly {
            index.decimal(record, &monthly_column(level))?
        } else {
            None
        };
        levels.set(level as u8, LevelRate::new(yearly, monthly));
    }
    Ok(levels)
}

pub const VISA_MCO_COLUMNS: &[&str] = &["provider_customer_code", "salesforce_product_name"];

pub const PARTNER_PAY_COLUMNS: &[&str] = &[
    "provider_customer_code",
    "salesforce_product_name",
    "partner_pay_bin",
    "partner_pay_airline",
];

pub const REGION_COUNTRY_COLUMNS: &[&str] = &[
    "provider_customer_code",
    "salesforce_product_name",
    "region_mc",
    "merchant_country",
];

pub const VOYAGE_PRIVE_COLUMNS: &[&str] = &["provider_customer_code", "salesforce_product_name"];

pub const AIRLINE_COLUMNS: &[&str] = &["airline_name", "airline_code"];

pub fn parse_visa_mco_row(
    index: &HeaderIndex,
    record: &StringRecord,
) -> Result<VisaMcoRow, RebateError> {
    Ok(VisaMcoRow {
        provider_customer_code: index.text(record, "provider_customer_code"),
        salesforce_product_name: index.text(record, "salesforce_product_name"),
        levels: parse_levels(index, record, true)?,
    })
}

pub fn parse_partner_pay_row(
    index: &HeaderIndex,
    record: &StringRecord,
) -> Result<PartnerPayRow, RebateError> {
    Ok(PartnerPayRow {
        provider_customer_code: index.text(record, "provider_customer_code"),
        salesforce_product_name: index.text(record, "salesforce_product_name"),
        partner_pay_bin: index.text(record, "partner_pay_bin"),
        partner_pay_airline: index.text(record, "partner_pay_airline"),
        levels: parse_levels(index, record, true)?,
    })
}

/// Region/country rows carry yearly rates only
pub fn parse_region_country_row(
    index: &HeaderIndex,
    record: &StringRecord,
) -> Result<RegionCountryRow, RebateError> {
    Ok(RegionCountryRow {
        provider_customer_code: index.text(record, "provider_customer_code"),
        salesforce_product_name: index.text(record, "salesforce_product_name"),
        region_mc: index.text(record, "region_mc"),
        merchant_country: index.text(record, "merchant_country"),
        levels: parse_levels(index, record, false)?,
    })
}

/// Voyage-privé rows carry yearly rates only
pub fn parse_voyage_prive_row(
    index: &HeaderIndex,
    record: &StringRecord,
) -> Result<VoyagePriveRow, RebateError> {
    Ok(VoyagePriveRow {
        provider_customer_code: index.text(record, "provider_customer_code"),
        salesforce_product_name: index.text(record, "salesforce_product_name"),
        levels: parse_levels(index, record, false)?,
    })
}

pub fn parse_airline_row(
    index: &HeaderIndex,
    record: &StringRecord,
) -> Result<AirlineEntry, RebateError> {
    Ok(AirlineEntry {
        name: index.text(record, "airline_name"),
        code: index.text(record, "airline_code"),
    })
}

/// Rows of a loaded table plus the rows that were skipped
#[derive(Debug, Clone, PartialEq)]
pub struct TableLoad<T> {
    pub rows: Vec<T>,
    pub skipped: Vec<RebateError>,
}

impl<T> Default for TableLoad<T> {
    fn default() -> Self {
        TableLoad {
            rows: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Read a header-indexed table
///
/// Malformed rows are logged, collected in `skipped`, and left out.
///
/// # Errors
///
/// Returns a `ParseError` if the header is unreadable or lacks one of
/// `required_columns`.
pub fn read_table<R, T, F>(
    reader: R,
    table: &str,
    required_columns: &[&str],
    parse: F,
) -> Result<TableLoad<T>, RebateError>
where
    R: Read,
    F: Fn(&HeaderIndex, &StringRecord) -> Result<T, RebateError>,
{
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let index = HeaderIndex::new(csv_reader.headers()?);
    if let Some(missing) = required_columns.iter().find(|c| !index.contains(c)) {
        return Err(RebateError::ParseError {
            line: Some(1),
            message: format!("{} table is missing column '{}'", table, missing),
        });
    }

    let mut load = TableLoad::default();
    for record in csv_reader.records() {
        let parsed = record
            .map_err(RebateError::from)
            .and_then(|record| parse(&index, &record));
        match parsed {
            Ok(row) => load.rows.push(row),
            Err(e) => {
                warn!(table, error = %e, "rule row skipped");
                load.skipped.push(e);
            }
        }
    }
    Ok(load)
}

/// Write the export header
pub fn write_export_header<W: Write>(writer: &mut Writer<W>) -> Result<(), RebateError> {
    writer.write_record(EXPORT_HEADERS)?;
    Ok(())
}

/// Write stored rebates as export rows
///
/// Amounts are written with exactly two decimals; rates are normalized.
pub fn write_export_rows<W: Write>(
    writer: &mut Writer<W>,
    rows: &[StoredRebate],
) -> Result<(), RebateError> {
    for row in rows {
        let rebate = &row.rebate;
        writer.write_record(&[
            row.id.to_string(),
            rebate.transaction_id.clone(),
            rebate.provider_customer_code.clone(),
            rebate.product_name.clone(),
            rebate.merchant_name.clone(),
            rebate.rebate_level.to_string(),
            rebate.rebate_percentage.normalize().to_string(),
            format!("{:.2}", rebate.rebate_amount),
            format!("{:.2}", rebate.rebate_amount_eur),
            rebate.calculation_type.to_string(),
        ])?;
    }
    Ok(())
}

/// Write a complete export (header plus rows) to `output`
pub fn write_rebates_csv(rows: &[StoredRebate], output: &mut dyn Write) -> Result<(), RebateError> {
    let mut writer = Writer::from_writer(output);
    write_export_header(&mut writer)?;
    write_export_rows(&mut writer, rows)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CalculatedRebate, CalculationType};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn dec(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    fn transaction_record(amount: &str, amount_eur: &str) -> CsvTransactionRecord {
        CsvTransactionRecord {
            transaction_id: "T1".to_string(),
            provider_customer_code: "P".to_string(),
            salesforce_product_name: "X".to_string(),
            transaction_amount: amount.to_string(),
            transaction_amount_eur: amount_eur.to_string(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case::plain("100.00", "92.50", dec(10000, 2), dec(9250, 2))]
    #[case::whitespace(" 100 ", "92.5", dec(100, 0), dec(925, 1))]
    #[case::negative("-10.00", "-9.25", dec(-1000, 2), dec(-925, 2))]
    fn test_convert_transaction_record_amounts(
        #[case] amount: &str,
        #[case] amount_eur: &str,
        #[case] expected: Decimal,
        #[case] expected_eur: Decimal,
    ) {
        let transaction = convert_transaction_record(transaction_record(amount, amount_eur)).unwrap();
        assert_eq!(transaction.transaction_amount, expected);
        assert_eq!(transaction.transaction_amount_eur, expected_eur);
    }

    #[rstest]
    #[case::blank_amount("", "1.00", "transaction_amount")]
    #[case::malformed_amount("abc", "1.00", "transaction_amount")]
    #[case::blank_eur_amount("1.00", "", "transaction_amount_eur")]
    fn test_convert_transaction_record_errors(
        #[case] amount: &str,
        #[case] amount_eur: &str,
        #[case] expected_field: &str,
    ) {
        let result = convert_transaction_record(transaction_record(amount, amount_eur));
        match result {
            Err(RebateError::InvalidField { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected InvalidField, got {:?}", other),
        }
    }

    #[rstest]
    #[case::absent(None, None)]
    #[case::blank(Some("  "), None)]
    #[case::present(Some("Deutsche Lufthansa AG"), Some("Deutsche Lufthansa AG"))]
    fn test_convert_transaction_record_legal_name(
        #[case] legal: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let mut record = transaction_record("1", "1");
        record.merchant_legal_name = legal.map(str::to_string);

        let transaction = convert_transaction_record(record).unwrap();
        assert_eq!(transaction.merchant_legal_name.as_deref(), expected);
    }

    #[test]
    fn test_read_visa_mco_table() {
        let csv = "provider_customer_code,salesforce_product_name,rebate_1_yearly,rebate_1_monthly,rebate_2_monthly\n\
                   P, X ,0.5,0.3,0.2\n\
                   Q,Y,,,\n";

        let load = read_table(csv.as_bytes(), "visa_mco", VISA_MCO_COLUMNS, parse_visa_mco_row).unwrap();

        assert!(load.skipped.is_empty());
        assert_eq!(load.rows.len(), 2);
        let row = &load.rows[0];
        assert_eq!(row.salesforce_product_name, "X");
        assert_eq!(row.levels.get(1), LevelRate::new(Some(dec(5, 1)), Some(dec(3, 1))));
        assert_eq!(row.levels.get(2), LevelRate::new(None, Some(dec(2, 1))));
        assert_eq!(row.levels.get(3), LevelRate::default());
        assert_eq!(load.rows[1].levels, RebateLevels::default());
    }

    #[test]
    fn test_read_region_table_ignores_monthly_columns() {
        let csv = "provider_customer_code,salesforce_product_name,region_mc,merchant_country,rebate_2_yearly,rebate_2_monthly\n\
                   P,X,EU,*,0.6,0.9\n";

        let load = read_table(
            csv.as_bytes(),
            "region_country",
            REGION_COUNTRY_COLUMNS,
            parse_region_country_row,
        )
        .unwrap();

        let row = &load.rows[0];
        assert_eq!(row.merchant_country, "*");
        assert_eq!(row.levels.get(2), LevelRate::yearly(dec(6, 1)));
    }

    #[test]
    fn test_read_table_skips_malformed_rows() {
        let csv = "provider_customer_code,salesforce_product_name,rebate_1_yearly\n\
                   P,X,0.5\n\
                   P,Y,half\n\
                   P,Z,0.7\n";

        let load = read_table(csv.as_bytes(), "visa_mco", VISA_MCO_COLUMNS, parse_visa_mco_row).unwrap();

        let products: Vec<_> = load
            .rows
            .iter()
            .map(|r| r.salesforce_product_name.as_str())
            .collect();
        assert_eq!(products, vec!["X", "Z"]);
        assert_eq!(
            load.skipped,
            vec![RebateError::invalid_field("rebate_1_yearly", "half")]
        );
    }

    #[test]
    fn test_read_table_requires_key_columns() {
        let csv = "provider_customer_code,rebate_1_yearly\nP,0.5\n";

        let result = read_table(
            csv.as_bytes(),
            "partnerpay",
            PARTNER_PAY_COLUMNS,
            parse_partner_pay_row,
        );

        match result {
            Err(RebateError::ParseError { message, .. }) => {
                assert!(message.contains("salesforce_product_name"))
            }
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_read_airlines() {
        let csv = "airline_name,airline_code\nLufthansa,LH\nAir France,AF\n";

        let load = read_table(csv.as_bytes(), "airlines", AIRLINE_COLUMNS, parse_airline_row).unwrap();

        assert_eq!(
            load.rows,
            vec![
                AirlineEntry::new("Lufthansa", "LH"),
                AirlineEntry::new("Air France", "AF")
            ]
        );
    }

    #[test]
    fn test_write_rebates_csv() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let rows = vec![StoredRebate {
            id: 1,
            created_at,
            rebate: CalculatedRebate {
                transaction_id: "T1".to_string(),
                provider_customer_code: "P".to_string(),
                product_name: "X".to_string(),
                merchant_name: "Lufthansa (LH)".to_string(),
                rebate_level: 2,
                rebate_percentage: dec(200, 3),
                rebate_amount: dec(2, 0),
                rebate_amount_eur: dec(185, 2),
                calculation_type: CalculationType::PartnerPay,
            },
        }];

        let mut output = Vec::new();
        write_rebates_csv(&rows, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            "id,transaction_id,provider_customer_code,product_name,merchant_name,rebate_level,rebate_percentage,rebate_amount,rebate_amount_eur,calculation_type\n\
             1,T1,P,X,Lufthansa (LH),2,0.2,2.00,1.85,partnerpay\n"
        );
    }

    #[test]
    fn test_write_rebates_csv_empty() {
        let mut output = Vec::new();
        write_rebates_csv(&[], &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            format!("{}\n", EXPORT_HEADERS.join(","))
        );
    }
}
