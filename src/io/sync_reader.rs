//! Synchronous CSV readers
//!
//! Provides a streaming iterator over transactions and loaders for the rule
//! and airline tables. Format concerns are delegated to the csv_format module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, unreadable header) are returned from the
//!   constructors and loaders
//! - Individual row errors are yielded as `Err` items (transactions) or
//!   collected in `TableLoad::skipped` (tables)
//! - Line numbers are included in row errors for debugging
//!
//! # Memory Efficiency
//!
//! `TransactionReader` reads one record at a time; only the rule tables are
//! loaded fully, since every transaction is matched against them.

use crate::io::csv_format::{
    convert_transaction_record, parse_airline_row, parse_partner_pay_row,
    parse_region_country_row, parse_visa_mco_row, parse_voyage_prive_row, read_table, with_line,
    CsvTransactionRecord, HeaderIndex, TableLoad, AIRLINE_COLUMNS, PARTNER_PAY_COLUMNS,
    REGION_COUNTRY_COLUMNS, VISA_MCO_COLUMNS, VOYAGE_PRIVE_COLUMNS,
};
use crate::types::{
    AirlineEntry, PartnerPayRow, RebateError, RegionCountryRow, Transaction, VisaMcoRow,
    VoyagePriveRow,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Open a file, mapping a missing file to `FileNotFound`
pub fn open_input(path: &Path) -> Result<File, RebateError> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RebateError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => RebateError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        },
    })
}

/// Synchronous transaction reader
///
/// Yields one `Result<Transaction, RebateError>` per data row.
#[derive(Debug)]
pub struct TransactionReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl TransactionReader {
    /// Open a transactions CSV
    ///
    /// The CSV reader trims all fields, allows ragged rows, and uses an 8KB
    /// buffer.
    pub fn new(path: &Path) -> Result<Self, RebateError> {
        let file = open_input(path)?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for TransactionReader {
    type Item = Result<Transaction, RebateError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvTransactionRecord>();
        let record = deserializer.next()?;
        self.line_num += 1;

        let line = self.line_num;
        Some(
            record
                .map_err(RebateError::from)
                .and_then(convert_transaction_record)
                .map_err(|e| with_line(line, e)),
        )
    }
}

fn load_table<T, F>(
    path: &Path,
    table: &str,
    required_columns: &[&str],
    parse: F,
) -> Result<TableLoad<T>, RebateError>
where
    F: Fn(&HeaderIndex, &StringRecord) -> Result<T, RebateError>,
{
    let load = read_table(open_input(path)?, table, required_columns, parse)?;
    info!(
        table,
        path = %path.display(),
        rows = load.rows.len(),
        skipped = load.skipped.len(),
        "loaded table"
    );
    Ok(load)
}

pub fn load_visa_mco(path: &Path) -> Result<TableLoad<VisaMcoRow>, RebateError> {
    load_table(path, "visa_mco", VISA_MCO_COLUMNS, parse_visa_mco_row)
}

pub fn load_partner_pay(path: &Path) -> Result<TableLoad<PartnerPayRow>, RebateError> {
    load_table(path, "partnerpay", PARTNER_PAY_COLUMNS, parse_partner_pay_row)
}

pub fn load_region_country(path: &Path) -> Result<TableLoad<RegionCountryRow>, RebateError> {
    load_table(
        path,
        "region_country",
        REGION_COUNTRY_COLUMNS,
        parse_region_country_row,
    )
}

pub fn load_voyage_prive(path: &Path) -> Result<TableLoad<VoyagePriveRow>, RebateError> {
    load_table(path, "voyage_prive", VOYAGE_PRIVE_COLUMNS, parse_voyage_prive_row)
}

pub fn load_airlines(path: &Path) -> Result<TableLoad<AirlineEntry>, RebateError> {
    load_table(path, "airlines", AIRLINE_COLUMNS, parse_airline_row)
}
