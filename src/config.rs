//! Engine configuration
//!
//! `RebateConfig` holds the values that vary between deployments: the airline
//! MCC, the two override provider sets, and the chunked store limits. It can be
//! loaded from a JSON file and is then refined by CLI flags.

use crate::types::{ProviderCode, RebateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

/// Merchant category code for airline ticketing
pub const DEFAULT_AIRLINE_MCC: &str = "4511";

/// Rows per persisted chunk
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Above this many rows `read_all` refuses to load the whole set
pub const DEFAULT_BULK_READ_THRESHOLD: usize = 100_000;

/// Rebate engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebateConfig {
    /// MCC whose merchant names are enhanced with airline labels
    pub airline_mcc: String,

    /// Providers whose Visa/MCO rates may be overridden by region/country rules
    pub region_country_providers: BTreeSet<ProviderCode>,

    /// Providers whose Visa/MCO rates may be overridden by voyage-privé rules
    pub voyage_prive_providers: BTreeSet<ProviderCode>,

    /// Rows per persisted chunk
    pub chunk_size: usize,

    /// Maximum row count `read_all` will materialize
    pub bulk_read_threshold: usize,
}

impl Default for RebateConfig {
    fn default() -> Self {
        RebateConfig {
            airline_mcc: DEFAULT_AIRLINE_MCC.to_string(),
            region_country_providers: BTreeSet::new(),
            voyage_prive_providers: BTreeSet::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            bulk_read_threshold: DEFAULT_BULK_READ_THRESHOLD,
        }
    }
}

impl RebateConfig {
    /// Load configuration from a JSON file
    ///
    /// Missing keys take their default values. Zero sizes are replaced by the
    /// defaults (see [`RebateConfig::normalized`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be read, or is not
    /// valid JSON for this structure.
    pub fn from_file(path: &Path) -> Result<Self, RebateError> {
        if !path.exists() {
            return Err(RebateError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: RebateConfig = serde_json::from_str(&content).map_err(|e| {
            RebateError::invalid_config(&format!("{}: {}", path.display(), e))
        })?;
        Ok(config.normalized())
    }

    /// Replace unusable sizes with defaults, warning about each replacement
    pub fn normalized(mut self) -> Self {
        if self.chunk_size == 0 {
            warn!(
                "Invalid chunk_size ({}), using default ({})",
                self.chunk_size, DEFAULT_CHUNK_SIZE
            );
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        if self.bulk_read_threshold == 0 {
            warn!(
                "Invalid bulk_read_threshold ({}), using default ({})",
                self.bulk_read_threshold, DEFAULT_BULK_READ_THRESHOLD
            );
            self.bulk_read_threshold = DEFAULT_BULK_READ_THRESHOLD;
        }
        if self.airline_mcc.trim().is_empty() {
            warn!("Empty airline_mcc, using default ({})", DEFAULT_AIRLINE_MCC);
            self.airline_mcc = DEFAULT_AIRLINE_MCC.to_string();
        }
        self
    }

    /// Providers configured in both override sets
    ///
    /// Such providers get region/country overrides first and voyage-privé
    /// overrides second. This is almost always a configuration mistake and is
    /// reported as a run warning.
    pub fn overlapping_providers(&self) -> Vec<ProviderCode> {
        self.region_country_providers
            .intersection(&self.voyage_prive_providers)
            .cloned()
            .collect()
    }
}
