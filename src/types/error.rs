//! Error types for the rebate engine
//!
//! This module defines all error types that can occur while loading inputs,
//! calculating rebates, and persisting results.
//!
//! # Error Categories
//!
//! - **File I/O Errors**: File not found, permission denied, etc.
//! - **Parsing Errors**: Malformed CSV, invalid decimals, malformed config
//! - **Calculation Errors**: Invalid transactions, arithmetic overflow (recoverable)
//! - **Storage Errors**: Chunk or manifest write failures (fatal)

use thiserror::Error;

/// Main error type for the rebate engine
///
/// Per-transaction variants are recorded as warnings by the calculation
/// engine and never abort a run. Storage variants are always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RebateError {
    /// File not found at the specified path
    ///
    /// This is a fatal error that prevents processing from starting.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// This is a recoverable error - the malformed record is skipped
    /// and processing continues with the next record.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// A field could not be converted to its typed value
    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidField {
        /// Column or field name
        field: String,
        /// The raw value that failed to parse
        value: String,
    },

    /// JSON serialization or deserialization failed
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Description of the serde failure
        message: String,
    },

    /// Configuration is unusable
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration
        message: String,
    },

    /// Transaction is malformed and cannot be rebated
    ///
    /// This is a recoverable error - the transaction is recorded as a
    /// warning and processing continues.
    #[error("Invalid transaction '{transaction_id}': {message}")]
    InvalidTransaction {
        /// Transaction ID (may be empty when the ID itself is missing)
        transaction_id: String,
        /// Description of the problem
        message: String,
    },

    /// Arithmetic overflow while computing a rebate amount
    ///
    /// This is a recoverable error - the transaction is recorded as a warning.
    #[error("Arithmetic overflow in {operation} for transaction {transaction_id}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Transaction ID
        transaction_id: String,
    },

    /// Writing a chunk failed
    ///
    /// This is a fatal error - a partial chunk set would corrupt later reads.
    #[error("Failed to write chunk {index}: {message}")]
    ChunkWrite {
        /// Chunk index
        index: usize,
        /// Underlying failure
        message: String,
    },

    /// Writing the chunk manifest failed
    #[error("Failed to write chunk metadata: {message}")]
    MetadataWrite {
        /// Underlying failure
        message: String,
    },

    /// Clearing a previous chunk set failed
    #[error("Failed to clear rebate store: {message}")]
    StoreClear {
        /// Underlying failure
        message: String,
    },

    /// The async runtime could not be started
    #[error("Runtime error: {message}")]
    RuntimeError {
        /// Underlying failure
        message: String,
    },
}

// Conversion from io::Error to RebateError
impl From<std::io::Error> for RebateError {
    fn from(error: std::io::Error) -> Self {
        RebateError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to RebateError
impl From<csv::Error> for RebateError {
    fn from(error: csv::Error) -> Self {
        // Extract line number if available
        let line = error.position().map(|pos| pos.line());

        RebateError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Conversion from serde_json::Error to RebateError
impl From<serde_json::Error> for RebateError {
    fn from(error: serde_json::Error) -> Self {
        RebateError::SerializationError {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl RebateError {
    /// Create an InvalidField error
    pub fn invalid_field(field: &str, value: &str) -> Self {
        RebateError::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: &str) -> Self {
        RebateError::InvalidConfig {
            message: message.to_string(),
        }
    }

    /// Create an InvalidTransaction error
    pub fn invalid_transaction(transaction_id: &str, message: &str) -> Self {
        RebateError::InvalidTransaction {
            transaction_id: transaction_id.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, transaction_id: &str) -> Self {
        RebateError::ArithmeticOverflow {
            operation: operation.to_string(),
            transaction_id: transaction_id.to_string(),
        }
    }

    /// Create a ChunkWrite error
    pub fn chunk_write(index: usize, message: impl ToString) -> Self {
        RebateError::ChunkWrite {
            index,
            message: message.to_string(),
        }
    }

    /// Create a MetadataWrite error
    pub fn metadata_write(message: impl ToString) -> Self {
        RebateError::MetadataWrite {
            message: message.to_string(),
        }
    }

    /// Create a StoreClear error
    pub fn store_clear(message: impl ToString) -> Self {
        RebateError::StoreClear {
            message: message.to_string(),
        }
    }

    /// Whether the error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RebateError::FileNotFound { .. }
                | RebateError::IoError { .. }
                | RebateError::InvalidConfig { .. }
                | RebateError::ChunkWrite { .. }
                | RebateError::MetadataWrite { .. }
                | RebateError::StoreClear { .. }
                | RebateError::RuntimeError { .. }
        )
    }
}
