use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::mapping::Direction;
use crate::runner::{MissingSourcePolicy, RunConfig, DEFAULT_MAPPING_FILE, DEFAULT_WORKDIR};

#[derive(Debug, Parser)]
#[command(
    name = "peflocus",
    author,
    version,
    about = "Remap flow identities in ILCD data set packages",
    long_about = "Rewrites flow references in process and LCIA method data sets using a \
                  location-qualified mapping table, and regenerates the referenced flow \
                  data sets under their new identities.\n\n\
                  Every *.zip in the working directory is processed; outputs are written \
                  next to the inputs as peflocus_<name> (map) or peflocus_unmapped_<name> (unmap)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory containing the zip packages
    #[arg(long, global = true, value_name = "DIR", default_value = DEFAULT_WORKDIR)]
    pub workdir: PathBuf,

    /// Mapping table (CSV: old_id, location, new_id; first row is a header)
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_MAPPING_FILE)]
    pub mapfile: PathBuf,

    /// Fail a package when a mapped flow cannot be generated for lack of its source
    #[arg(long, global = true)]
    pub strict: bool,

    /// Output the run summary as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (debug logging, dangling ids in the summary)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Replace old flow ids with location-specific ids
    Map,

    /// Restore original flow ids and locations from mapped packages
    Unmap,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Map => "map",
            Commands::Unmap => "unmap",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Commands::Map => Direction::Apply,
            Commands::Unmap => Direction::Reverse,
        }
    }
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        let policy = if self.strict {
            MissingSourcePolicy::FailArchive
        } else {
            MissingSourcePolicy::Degrade
        };
        RunConfig::new(self.command.direction())
            .with_workdir(&self.workdir)
            .with_mapping_file(&self.mapfile)
            .with_missing_source(policy)
    }
}
