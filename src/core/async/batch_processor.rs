//! Parallel batch resolution for async rebate calculation
//!
//! This module provides the `BatchProcessor` struct, which resolves a batch of
//! transactions on several tokio tasks while keeping output order equal to
//! input order.
//!
//! # Design
//!
//! Rebate resolution has no cross-transaction state, so a batch can be split
//! into fixed-size partitions of consecutive transactions. Each partition is
//! resolved on its own task; results are collected into a `DashMap` keyed by
//! partition index and reassembled in index order.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     ├── Arc<RebateCalculationEngine>  (read-only resolvers and config)
//!     ├── Arc<BaseTables>               (read-only Visa/MCO + PartnerPay indexes)
//!     └── partition_size                (transactions per task)
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::core::engine::RebateCalculationEngine;
use crate::core::rule_tables::BaseTables;
use crate::types::{CalculatedRebate, RebateError, Transaction, TransactionId};

/// Result of resolving a single transaction
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub transaction_id: TransactionId,
    pub result: Result<Vec<CalculatedRebate>, RebateError>,
}

/// Batch processor with order-preserving partitioning
///
/// Cloning is cheap: the engine and the tables are shared through `Arc`.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<RebateCalculationEngine>,
    tables: Arc<BaseTables>,
    partition_size: usize,
}

impl BatchProcessor {
    /// Create a new BatchProcessor
    ///
    /// A zero partition size is treated as one transaction per task.
    pub fn new(
        engine: Arc<RebateCalculationEngine>,
        tables: Arc<BaseTables>,
        partition_size: usize,
    ) -> Self {
        Self {
            engine,
            tables,
            partition_size: partition_size.max(1),
        }
    }

    /// Partition size that spreads `batch_size` transactions over `workers` tasks
    pub fn partition_size_for(batch_size: usize, workers: usize) -> usize {
        batch_size.div_ceil(workers.max(1)).max(1)
    }

    /// Split a batch into consecutive partitions
    ///
    /// # Guarantees
    ///
    /// - Each transaction appears in exactly one partition
    /// - Concatenating the partitions in order yields the original batch
    pub fn partition(&self, batch: Vec<Transaction>) -> Vec<Vec<Transaction>> {
        let mut partitions = Vec::with_capacity(batch.len().div_ceil(self.partition_size));
        let mut current = Vec::with_capacity(self.partition_size);

        for transaction in batch {
            current.push(transaction);
            if current.len() == self.partition_size {
                partitions.push(std::mem::replace(
                    &mut current,
                    Vec::with_capacity(self.partition_size),
                ));
            }
        }
        if !current.is_empty() {
            partitions.push(current);
        }

        partitions
    }

    /// Resolve one partition sequentially
    pub fn process_partition(&self, transactions: &[Transaction]) -> Vec<ProcessingResult> {
        transactions
            .iter()
            .map(|transaction| ProcessingResult {
                transaction_id: transaction.transaction_id.clone(),
                result: self.engine.resolve_transaction(transaction, &self.tables),
            })
            .collect()
    }

    /// Resolve a batch concurrently, returning results in input order
    ///
    /// # Errors
    ///
    /// Returns a `RuntimeError` if a worker task panics or is cancelled;
    /// individual transaction failures are carried inside the results.
    pub async fn process_batch(
        &self,
        batch: Vec<Transaction>,
    ) -> Result<Vec<ProcessingResult>, RebateError> {
        let partitions = self.partition(batch);
        let partition_count = partitions.len();
        let collected: Arc<DashMap<usize, Vec<ProcessingResult>>> =
            Arc::new(DashMap::with_capacity(partition_count));

        let mut tasks = Vec::with_capacity(partition_count);
        for (index, transactions) in partitions.into_iter().enumerate() {
            let processor = self.clone();
            let collected = Arc::clone(&collected);
            tasks.push(tokio::spawn(async move {
                let results = processor.process_partition(&transactions);
                collected.insert(index, results);
            }));
        }

        for task in tasks {
            task.await.map_err(|e| RebateError::RuntimeError {
                message: format!("batch worker failed: {}", e),
            })?;
        }
        debug!(partitions = partition_count, "batch resolved");

        let mut results = Vec::new();
        for index in 0..partition_count {
            if let Some((_, partition_results)) = collected.remove(&index) {
                results.extend(partition_results);
            }
        }
        Ok(results)
    }
}
