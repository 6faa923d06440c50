//! Core business logic module
//!
//! This module contains the rebate calculation components, leaf first:
//! - `matchers` - Key matching predicates (provider, product, BIN, airline)
//! - `merchant` - Airline display-name enhancement
//! - `rule_tables` - Indexed, read-only rule tables
//! - `resolvers` - One resolver per rule source
//! - `priority` - Staged fold of resolver outputs into one rate per level
//! - `engine` - Batch orchestration, warnings, and persistence
//! - `async` - Parallel batch resolution

pub mod r#async;
pub mod engine;
pub mod matchers;
pub mod merchant;
pub mod priority;
pub mod resolvers;
pub mod rule_tables;

pub use engine::{CalculationOutcome, RebateCalculationEngine};
pub use merchant::MerchantNameEnhancer;
pub use priority::{PriorityEngine, ResolutionStage};
pub use r#async::{BatchProcessor, ProcessingResult};
pub use rule_tables::BaseTables;
