//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `transaction`: Transaction input records and identifiers
//! - `rules`: Rebate rule table rows and the fixed eight-level rate layout
//! - `rebate`: Calculated rebates, persisted rows, chunk metadata, and summaries
//! - `error`: Error types for the rebate engine

pub mod error;
pub mod rebate;
pub mod rules;
pub mod transaction;

pub use error::RebateError;
pub use rebate::{CalculatedRebate, CalculationType, ChunkMetadata, RebateSummary, StoredRebate};
pub use rules::{
    AirlineEntry, LevelRate, PartnerPayRow, RebateLevel, RebateLevels, RegionCountryRow,
    VisaMcoRow, VoyagePriveRow, REBATE_LEVEL_COUNT,
};
pub use transaction::{ProviderCode, Transaction, TransactionId};
