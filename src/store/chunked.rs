//! Bounded-memory persistence of calculated rebates
//!
//! A write splits the result set into fixed-size chunks, assigns sequential
//! IDs, writes every chunk and then the manifest. Each write fully replaces
//! the previous chunk set. Reads are either chunk by chunk (constant memory)
//! or a guarded bulk read that refuses oversized sets.

use super::backend::ChunkBackend;
use crate::types::{CalculatedRebate, ChunkMetadata, RebateError, StoredRebate};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Chunked store over any [`ChunkBackend`]
#[derive(Debug)]
pub struct ChunkedRebateStore<B: ChunkBackend> {
    backend: B,
    chunk_size: usize,
    bulk_read_threshold: usize,
}

impl<B: ChunkBackend> ChunkedRebateStore<B> {
    /// Create a store with the given chunk size and bulk-read threshold
    ///
    /// A zero chunk size is treated as one row per chunk.
    pub fn new(backend: B, chunk_size: usize, bulk_read_threshold: usize) -> Self {
        ChunkedRebateStore {
            backend,
            chunk_size: chunk_size.max(1),
            bulk_read_threshold,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replace the stored set with `rebates`
    ///
    /// IDs start at 1 and follow input order. All rows of one write share the
    /// same `created_at`.
    ///
    /// # Errors
    ///
    /// Clearing, chunk, and manifest failures are all fatal and returned as-is.
    pub fn write_all(&mut self, rebates: &[CalculatedRebate]) -> Result<ChunkMetadata, RebateError> {
        self.backend.clear()?;

        let created_at = Utc::now();
        let mut next_id: u64 = 1;
        let mut chunk_count = 0;

        for (index, chunk) in rebates.chunks(self.chunk_size).enumerate() {
            let rows: Vec<StoredRebate> = chunk
                .iter()
                .map(|rebate| {
                    let row = StoredRebate {
                        id: next_id,
                        created_at,
                        rebate: rebate.clone(),
                    };
                    next_id += 1;
                    row
                })
                .collect();
            self.backend.write_chunk(index, &rows)?;
            debug!(chunk = index, rows = rows.len(), "wrote rebate chunk");
            chunk_count += 1;
        }

        let metadata = ChunkMetadata {
            total_rebates: rebates.len(),
            chunk_count,
            chunk_size: self.chunk_size,
            created_at,
        };
        self.backend.write_metadata(&metadata)?;

        info!(
            total_rebates = metadata.total_rebates,
            chunk_count = metadata.chunk_count,
            "persisted rebates"
        );
        Ok(metadata)
    }

    /// Manifest of the last completed write
    pub fn read_metadata(&self) -> Result<Option<ChunkMetadata>, RebateError> {
        self.backend.read_metadata()
    }

    /// Rows of one chunk, empty if the chunk does not exist
    pub fn read_chunk(&self, index: usize) -> Result<Vec<StoredRebate>, RebateError> {
        Ok(self.backend.read_chunk(index)?.unwrap_or_default())
    }

    /// Every stored row, or nothing when the set is too large
    ///
    /// Returns an empty vector (and logs a warning) when the stored total
    /// exceeds the bulk-read threshold. Callers should use
    /// [`for_each_chunk`](Self::for_each_chunk) for large sets.
    pub fn read_all(&self) -> Result<Vec<StoredRebate>, RebateError> {
        let Some(metadata) = self.backend.read_metadata()? else {
            return Ok(Vec::new());
        };

        if metadata.total_rebates > self.bulk_read_threshold {
            warn!(
                total_rebates = metadata.total_rebates,
                threshold = self.bulk_read_threshold,
                "refusing bulk read of rebate store, iterate chunks instead"
            );
            return Ok(Vec::new());
        }

        let mut rows = Vec::with_capacity(metadata.total_rebates);
        for index in 0..metadata.chunk_count {
            rows.extend(self.read_chunk(index)?);
        }
        Ok(rows)
    }

    /// Visit each non-empty chunk in order, holding one chunk in memory at a time
    ///
    /// The callback receives the chunk index and its rows. An error returned by
    /// the callback stops the iteration and is propagated.
    pub fn for_each_chunk<F>(&self, mut callback: F) -> Result<(), RebateError>
    where
        F: FnMut(usize, &[StoredRebate]) -> Result<(), RebateError>,
    {
        let Some(metadata) = self.backend.read_metadata()? else {
            return Ok(());
        };

        for index in 0..metadata.chunk_count {
            let rows = self.read_chunk(index)?;
            if rows.is_empty() {
                continue;
            }
            callback(index, &rows)?;
        }
        Ok(())
    }

    /// Remove all stored chunks and the manifest
    pub fn clear(&mut self) -> Result<(), RebateError> {
        self.backend.clear()
    }
}
