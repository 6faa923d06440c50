//! Parallel resolution of transaction batches
//!
//! Resolvers only read shared tables, so the async path needs no locking on
//! the calculation side. The `BatchProcessor` spreads a batch over tokio tasks
//! and reassembles results through a `DashMap` keyed by partition index.

pub mod batch_processor;

pub use batch_processor::{BatchProcessor, ProcessingResult};
