//! Rebate Engine Library
//! # Overview
//!
//! This library calculates per-transaction rebate entitlements by matching
//! payment transactions against four prioritized rule tables, and persists
//! the results through a bounded-memory chunked store.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Transaction, rule rows, CalculatedRebate, errors)
//! - [`config`] - Engine configuration (airline MCC, override providers, store limits)
//! - [`cli`] - CLI arguments parsing and the end-to-end run
//! - [`core`] - Business logic components:
//!   - [`core::matchers`] - Provider, product, BIN, and airline matching
//!   - [`core::merchant`] - Airline display-name enhancement
//!   - [`core::resolvers`] - One resolver per rule source
//!   - [`core::priority`] - Staged fold into at most one rate per level
//!   - [`core::engine`] - Batch calculation, warnings, and persistence
//! - [`store`] - Chunked rebate store over pluggable backends
//! - [`io`] - CSV ingestion and export
//! - [`strategy`] - Sequential and parallel processing pipelines
//!
//! # Rule Priority
//!
//! For each transaction and each rebate level 1-8:
//!
//! - **VisaMCO**: exact provider and product; yearly rate over monthly
//! - **PartnerPay**: fills levels VisaMCO left empty; matched on provider,
//!   product, BIN, and raw merchant name
//! - **RegionCountry**: for configured providers, overrides VisaMCO levels
//!   by region and merchant country
//! - **VoyagePrive**: for configured providers, overrides and adds levels
//!
//! Levels whose final rate is zero produce no rebate.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod store;
pub mod strategy;
pub mod types;

pub use config::RebateConfig;
pub use core::{BaseTables, CalculationOutcome, RebateCalculationEngine};
pub use io::write_rebates_csv;
pub use store::{ChunkBackend, ChunkedRebateStore, FileBackend, MemoryBackend};
pub use types::{
    CalculatedRebate, CalculationType, ChunkMetadata, RebateError, RebateSummary, StoredRebate,
    Transaction,
};
