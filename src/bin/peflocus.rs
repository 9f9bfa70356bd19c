//! peflocus: remap flow identities in ILCD data set packages
//!
//! ## Example Usage
//!
//! ```bash
//! # Map every package in ./zips using ./flow_mapping.csv
//! peflocus map
//!
//! # Restore the original ids, failing packages with missing source flows
//! peflocus unmap --workdir out --mapfile mappings.csv --strict
//!
//! # Machine-readable summary
//! peflocus map --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use peflocus::args::Cli;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.run_config();
    info!(command = cli.command.name(), mapfile = %config.mapping_file.display(), "peflocus");
    let summary = peflocus::run(&config)?;

    if cli.json {
        println!("{}", summary.to_json());
    } else {
        print!("{}", summary.format_human(cli.verbose));
    }
    Ok(())
}
