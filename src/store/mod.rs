//! Chunked persistence of calculated rebates
//!
//! - `backend` - The `ChunkBackend` trait and the in-memory backend
//! - `file` - Directory of JSON chunk files plus a manifest
//! - `chunked` - `ChunkedRebateStore`, the bounded-memory store over a backend

pub mod backend;
pub mod chunked;
pub mod file;

pub use backend::{ChunkBackend, MemoryBackend};
pub use chunked::ChunkedRebateStore;
pub use file::FileBackend;
