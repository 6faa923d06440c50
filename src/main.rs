//! Rebate Engine CLI
//!
//! Command-line interface for calculating payment card rebates from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --transactions tx.csv --visa-mco visa.csv --partnerpay pp.csv > rebates.csv
//! cargo run -- --transactions tx.csv --visa-mco visa.csv --partnerpay pp.csv \
//!     --region-country rc.csv --region-provider AF01 \
//!     --voyage-prive vp.csv --voyage-provider VP01 \
//!     --airlines airlines.csv --strategy sync --store-dir ./rebate-store > rebates.csv
//! ```
//!
//! The program calculates rebates with the selected processing strategy,
//! persists them in the chunked store, and streams the stored rebates to
//! stdout as CSV. Logs go to stderr; set `RUST_LOG` to change verbosity.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Fatal error (missing input, invalid configuration, storage failure, etc.)

use rebate_engine::cli;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rebate_engine=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let mut output = std::io::stdout().lock();
    if let Err(e) = cli::run(&args, &mut output) {
        error!(error = %e, "rebate run failed");
        process::exit(1);
    }
}
