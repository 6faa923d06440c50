//! I/O module
//!
//! Handles CSV ingestion of transactions and rule tables, and CSV export of
//! stored rebates.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, table parsing, export)
//! - `sync_reader` - Transaction iterator and table loaders
//! - `async_reader` - Asynchronous transaction reader with batch interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncTransactionReader;
pub use csv_format::{
    convert_transaction_record, write_export_header, write_export_rows, write_rebates_csv,
    CsvTransactionRecord, TableLoad,
};
pub use sync_reader::{
    load_airlines, load_partner_pay, load_region_country, load_visa_mco, load_voyage_prive,
    TransactionReader,
};
