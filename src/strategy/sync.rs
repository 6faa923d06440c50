//! Synchronous processing strategy
//!
//! Single-threaded baseline: transactions are streamed one at a time from the
//! CSV reader and resolved in input order. Memory usage is bounded by the
//! rule tables plus the produced rebates, not by the input file size.

use crate::core::{BaseTables, CalculationOutcome, RebateCalculationEngine};
use crate::io::sync_reader::TransactionReader;
use crate::strategy::ProcessingStrategy;
use crate::types::RebateError;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Synchronous processing strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn calculate(
        &self,
        transactions_path: &Path,
        engine: &Arc<RebateCalculationEngine>,
        tables: &Arc<BaseTables>,
    ) -> Result<CalculationOutcome, RebateError> {
        let reader = TransactionReader::new(transactions_path)?;
        let mut outcome = engine.begin_outcome();

        for item in reader {
            match item {
                Ok(transaction) => outcome.record(
                    &transaction.transaction_id,
                    engine.resolve_transaction(&transaction, tables),
                ),
                Err(e) => outcome.record_skipped_row(&e),
            }
        }

        info!(
            strategy = "sync",
            transactions = outcome.summary.transaction_count,
            rebates = outcome.summary.rebate_count,
            "calculation finished"
        );
        Ok(outcome)
    }
}
