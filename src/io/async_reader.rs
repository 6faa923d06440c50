//! Asynchronous transaction reader with batch interface
//!
//! # Design
//!
//! The AsyncTransactionReader uses:
//! - csv-async for streaming CSV parsing
//! - the csv_format module for record conversion
//! - batch reading so each batch can be resolved in parallel
//!
//! ```text
//! CSV file → AsyncTransactionReader → batches of Result<Transaction, RebateError>
//!                    ↓
//!             csv_format module
//!   (CsvTransactionRecord, convert_transaction_record)
//! ```
//!
//! Row errors stay in the batch at their input position so that callers can
//! report them in the same order as the synchronous reader.

use crate::io::csv_format::{convert_transaction_record, with_line, CsvTransactionRecord};
use crate::types::{RebateError, Transaction};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader for transactions
pub struct AsyncTransactionReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncTransactionReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read up to `batch_size` rows
    ///
    /// Returns an empty vector once the end of the input is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Result<Transaction, RebateError>> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvTransactionRecord>();

        while batch.len() < batch_size {
            let Some(record) = records.next().await else {
                break;
            };
            self.line_num += 1;
            let line = self.line_num;
            let converted = match record {
                Ok(record) => convert_transaction_record(record),
                Err(e) => Err(RebateError::ParseError {
                    line: None,
                    message: e.to_string(),
                }),
            };
            batch.push(converted.map_err(|e| with_line(line, e)));
        }

        batch
    }
}
