//! End-to-end run behind the binary
//!
//! ```text
//! load tables → calculate (strategy) → persist (chunked store) → stream CSV export
//! ```

use crate::cli::CliArgs;
use crate::core::{BaseTables, CalculationOutcome, RebateCalculationEngine};
use crate::io::csv_format::{write_export_header, write_export_rows, TableLoad};
use crate::io::sync_reader::{
    load_airlines, load_partner_pay, load_region_country, load_visa_mco, load_voyage_prive,
};
use crate::store::{ChunkBackend, ChunkedRebateStore, FileBackend};
use crate::strategy::create_strategy;
use crate::types::{ChunkMetadata, RebateError};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: CalculationOutcome,
    pub metadata: ChunkMetadata,
    /// Rows streamed to the export writer
    pub exported: usize,
}

/// Load an optional table; an absent path means an empty table
fn load_optional<T>(
    path: Option<&Path>,
    load: fn(&Path) -> Result<TableLoad<T>, RebateError>,
) -> Result<TableLoad<T>, RebateError> {
    match path {
        Some(path) => load(path),
        None => Ok(TableLoad::default()),
    }
}

fn skipped_warnings<T>(table: &str, load: &TableLoad<T>) -> Vec<String> {
    load.skipped
        .iter()
        .map(|e| format!("Skipped {} row: {}", table, e))
        .collect()
}

/// Stream every stored rebate to `output` as CSV, one chunk at a time
///
/// Returns the number of rows written.
pub fn export_store<B: ChunkBackend>(
    store: &ChunkedRebateStore<B>,
    output: &mut dyn Write,
) -> Result<usize, RebateError> {
    let mut writer = csv::Writer::from_writer(output);
    write_export_header(&mut writer)?;

    let mut written = 0;
    store.for_each_chunk(|_, rows| {
        write_export_rows(&mut writer, rows)?;
        written += rows.len();
        Ok(())
    })?;

    writer.flush()?;
    Ok(written)
}

/// Run the whole pipeline for parsed CLI arguments
///
/// # Errors
///
/// Returns an error for any fatal condition: unreadable inputs or
/// configuration, runtime failure, storage failure, or export failure.
pub fn run(args: &CliArgs, output: &mut dyn Write) -> Result<RunReport, RebateError> {
    let config = args.to_rebate_config()?;
    info!(
        transactions = %args.transactions.display(),
        strategy = ?args.strategy,
        store_dir = %args.store_dir.display(),
        "starting rebate run"
    );

    let visa_mco = load_visa_mco(&args.visa_mco)?;
    let partner_pay = load_partner_pay(&args.partner_pay)?;
    let region_country = load_optional(args.region_country.as_deref(), load_region_country)?;
    let voyage_prive = load_optional(args.voyage_prive.as_deref(), load_voyage_prive)?;
    let airlines = load_optional(args.airlines.as_deref(), load_airlines)?;

    let mut table_warnings = Vec::new();
    table_warnings.extend(skipped_warnings("visa_mco", &visa_mco));
    table_warnings.extend(skipped_warnings("partnerpay", &partner_pay));
    table_warnings.extend(skipped_warnings("region_country", &region_country));
    table_warnings.extend(skipped_warnings("voyage_prive", &voyage_prive));
    table_warnings.extend(skipped_warnings("airlines", &airlines));

    let engine = Arc::new(RebateCalculationEngine::new(
        config.clone(),
        region_country.rows,
        voyage_prive.rows,
        airlines.rows,
    ));
    let tables = Arc::new(BaseTables::new(visa_mco.rows, partner_pay.rows));

    let strategy = create_strategy(args.strategy.clone(), Some(args.to_batch_config()));
    let mut outcome = strategy.calculate(&args.transactions, &engine, &tables)?;
    table_warnings.append(&mut outcome.warnings);
    outcome.warnings = table_warnings;

    let backend = FileBackend::new(&args.store_dir)?;
    let mut store = ChunkedRebateStore::new(backend, config.chunk_size, config.bulk_read_threshold);
    let metadata = store.write_all(&outcome.rebates)?;
    info!(
        store_dir = %store.backend().dir().display(),
        rebates = metadata.total_rebates,
        chunks = metadata.chunk_count,
        "rebates persisted"
    );

    let exported = export_store(&store, output)?;

    let summary = &outcome.summary;
    info!(
        transactions = summary.transaction_count,
        rebates = summary.rebate_count,
        total_amount = %summary.total_amount,
        total_amount_eur = %summary.total_amount_eur,
        warnings = outcome.warnings.len(),
        "rebate run finished"
    );
    for (calculation_type, amount) in &summary.amount_by_type {
        debug!(%calculation_type, amount_eur = %amount, "total by calculation type");
    }

    Ok(RunReport {
        outcome,
        metadata,
        exported,
    })
}
