// CLI module
// Command-line interface, argument parsing, and the end-to-end run

mod args;
mod run;

pub use args::{CliArgs, StrategyType, DEFAULT_STORE_DIR};
pub use run::{export_store, run, RunReport};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// On invalid arguments or `--help`, clap prints the message and exits.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
