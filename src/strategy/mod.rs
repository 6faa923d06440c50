//! Processing strategy module for rebate calculation
//!
//! This module defines the Strategy pattern for the calculation pipeline,
//! encompassing both transaction CSV parsing and engine resolution. This
//! allows different implementations (sequential, parallel batch) to be
//! selected at runtime while producing identical outcomes.

use crate::cli::StrategyType;
use crate::core::{BaseTables, CalculationOutcome, RebateCalculationEngine};
use crate::types::RebateError;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for the calculation pipeline
pub trait ProcessingStrategy: Send + Sync {
    /// Calculate rebates for every transaction in a CSV file
    ///
    /// Rows are resolved against `tables` by `engine`. The outcome lists
    /// rebates in input order regardless of strategy.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions: the input cannot be
    /// opened, or the runtime fails. Malformed rows and failing transactions
    /// are reported as warnings in the outcome.
    fn calculate(
        &self,
        transactions_path: &Path,
        engine: &Arc<RebateCalculationEngine>,
        tables: &Arc<BaseTables>,
    ) -> Result<CalculationOutcome, RebateError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` only applies to the async strategy.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
