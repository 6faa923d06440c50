use crate::config::RebateConfig;
use crate::strategy::BatchConfig;
use crate::types::RebateError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Default directory of the chunked rebate store
pub const DEFAULT_STORE_DIR: &str = "./rebate-store";

/// Calculate payment card rebates from transaction and rule CSVs
#[derive(Parser, Debug)]
#[command(name = "rebate-engine")]
#[command(about = "Calculate payment card rebates from transaction and rule CSVs", long_about = None)]
pub struct CliArgs {
    /// Transactions CSV
    #[arg(long = "transactions", value_name = "FILE")]
    pub transactions: PathBuf,

    /// Visa/MCO rules CSV
    #[arg(long = "visa-mco", value_name = "FILE")]
    pub visa_mco: PathBuf,

    /// PartnerPay rules CSV
    #[arg(long = "partnerpay", value_name = "FILE")]
    pub partner_pay: PathBuf,

    /// Region/country override rules CSV
    #[arg(long = "region-country", value_name = "FILE")]
    pub region_country: Option<PathBuf>,

    /// Voyage-privé override rules CSV
    #[arg(long = "voyage-prive", value_name = "FILE")]
    pub voyage_prive: Option<PathBuf>,

    /// Airline reference table CSV (airline_name, airline_code)
    #[arg(long = "airlines", value_name = "FILE")]
    pub airlines: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory of the chunked rebate store
    #[arg(long = "store-dir", value_name = "DIR", default_value = DEFAULT_STORE_DIR)]
    pub store_dir: PathBuf,

    /// Processing strategy to use
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for parallel batches"
    )]
    pub strategy: StrategyType,

    /// Number of transactions per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transactions per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent workers (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Provider eligible for region/country overrides (repeatable)
    #[arg(long = "region-provider", value_name = "PROVIDER")]
    pub region_providers: Vec<String>,

    /// Provider eligible for voyage-privé overrides (repeatable)
    #[arg(long = "voyage-provider", value_name = "PROVIDER")]
    pub voyage_providers: Vec<String>,

    /// Rows per persisted chunk
    #[arg(long = "chunk-size", value_name = "ROWS")]
    pub chunk_size: Option<usize>,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; zero values are replaced with a
    /// warning by `BatchConfig::new`.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Resolve the engine configuration
    ///
    /// Starts from the JSON file when given (defaults otherwise), then adds
    /// the providers named on the command line and applies `--chunk-size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is missing or invalid.
    pub fn to_rebate_config(&self) -> Result<RebateConfig, RebateError> {
        let mut config = match &self.config {
            Some(path) => RebateConfig::from_file(path)?,
            None => RebateConfig::default(),
        };

        config
            .region_country_providers
            .extend(self.region_providers.iter().cloned());
        config
            .voyage_prive_providers
            .extend(self.voyage_providers.iter().cloned());
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }

        Ok(config.normalized())
    }
}
