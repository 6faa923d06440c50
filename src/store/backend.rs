//! Storage backend abstraction for persisted rebate chunks
//!
//! The chunked store only ever needs to put and get whole chunks plus a single
//! manifest, so the backend surface is kept to those operations. Both the
//! file-backed and in-memory implementations satisfy the same trait and are
//! interchangeable behind [`ChunkedRebateStore`](super::ChunkedRebateStore).

use crate::types::{ChunkMetadata, RebateError, StoredRebate};
use std::collections::BTreeMap;

/// Trait for storing and retrieving rebate chunks
pub trait ChunkBackend {
    /// Write (or replace) the chunk at `index`
    fn write_chunk(&mut self, index: usize, rows: &[StoredRebate]) -> Result<(), RebateError>;

    /// Read the chunk at `index`, `None` if it was never written
    fn read_chunk(&self, index: usize) -> Result<Option<Vec<StoredRebate>>, RebateError>;

    /// Write (or replace) the manifest
    fn write_metadata(&mut self, metadata: &ChunkMetadata) -> Result<(), RebateError>;

    /// Read the manifest, `None` if no write has completed yet
    fn read_metadata(&self) -> Result<Option<ChunkMetadata>, RebateError>;

    /// Remove every chunk and the manifest
    fn clear(&mut self) -> Result<(), RebateError>;
}

/// In-memory backend
///
/// Used by tests and by callers that only need the chunking behaviour
/// without touching disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    chunks: BTreeMap<usize, Vec<StoredRebate>>,
    metadata: Option<ChunkMetadata>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks currently held
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl ChunkBackend for MemoryBackend {
    fn write_chunk(&mut self, index: usize, rows: &[StoredRebate]) -> Result<(), RebateError> {
        self.chunks.insert(index, rows.to_vec());
        Ok(())
    }

    fn read_chunk(&self, index: usize) -> Result<Option<Vec<StoredRebate>>, RebateError> {
        Ok(self.chunks.get(&index).cloned())
    }

    fn write_metadata(&mut self, metadata: &ChunkMetadata) -> Result<(), RebateError> {
        self.metadata = Some(metadata.clone());
        Ok(())
    }

    fn read_metadata(&self) -> Result<Option<ChunkMetadata>, RebateError> {
        Ok(self.metadata.clone())
    }

    fn clear(&mut self) -> Result<(), RebateError> {
        self.chunks.clear();
        self.metadata = None;
        Ok(())
    }
}
