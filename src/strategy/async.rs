//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Transactions are read in batches and each batch
//! is resolved in parallel partitions.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncTransactionReader (batch CSV reading)
//!     └── BatchProcessor (order-preserving partitions on tokio tasks)
//!         ├── Arc<RebateCalculationEngine>
//!         └── Arc<BaseTables>
//! ```
//!
//! # Ordering
//!
//! Batches are processed one after another and results inside a batch are
//! reassembled by partition index, so the outcome (rebates and warnings) is
//! identical to the synchronous strategy for the same input.

use crate::core::r#async::BatchProcessor;
use crate::core::{BaseTables, CalculationOutcome, RebateCalculationEngine};
use crate::io::async_reader::AsyncTransactionReader;
use crate::strategy::ProcessingStrategy;
use crate::types::{RebateError, Transaction};
use std::path::Path;
use std::sync::Arc;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{info, warn};

/// Configuration for batch processing
///
/// Controls how many transactions are read per batch and how many worker
/// threads resolve a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of transactions per batch
    pub batch_size: usize,
    /// Worker threads, and partitions per batch
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                "Invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches, default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}

/// A batch row: either a transaction slot or an input error
enum BatchEntry {
    Transaction,
    Skipped(RebateError),
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn calculate(
        &self,
        transactions_path: &Path,
        engine: &Arc<RebateCalculationEngine>,
        tables: &Arc<BaseTables>,
    ) -> Result<CalculationOutcome, RebateError> {
        // Multi-threaded runtime with the configured number of worker threads
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| RebateError::RuntimeError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(
                Arc::clone(engine),
                Arc::clone(tables),
                BatchProcessor::partition_size_for(
                    self.config.batch_size,
                    self.config.max_concurrent_batches,
                ),
            );

            let file = tokio::fs::File::open(transactions_path)
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => RebateError::FileNotFound {
                        path: transactions_path.display().to_string(),
                    },
                    _ => RebateError::IoError {
                        message: format!(
                            "Failed to open file '{}': {}",
                            transactions_path.display(),
                            e
                        ),
                    },
                })?;

            let mut reader = AsyncTransactionReader::new(file.compat());
            let mut outcome = engine.begin_outcome();
            let mut batches = 0usize;

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                batches += 1;

                let mut entries = Vec::with_capacity(batch.len());
                let mut transactions: Vec<Transaction> = Vec::with_capacity(batch.len());
                for item in batch {
                    match item {
                        Ok(transaction) => {
                            transactions.push(transaction);
                            entries.push(BatchEntry::Transaction);
                        }
                        Err(e) => entries.push(BatchEntry::Skipped(e)),
                    }
                }

                // Wait for the whole batch before reading the next one
                let mut results = processor.process_batch(transactions).await?.into_iter();
                for entry in entries {
                    match entry {
                        BatchEntry::Skipped(e) => outcome.record_skipped_row(&e),
                        BatchEntry::Transaction => {
                            if let Some(processed) = results.next() {
                                outcome.record(&processed.transaction_id, processed.result);
                            }
                        }
                    }
                }
            }

            info!(
                strategy = "async",
                batches,
                transactions = outcome.summary.transaction_count,
                rebates = outcome.summary.rebate_count,
                "calculation finished"
            );
            Ok(outcome)
        })
    }
}
