//! peflocus: flow identity remapping for ILCD data set packages
//!
//! Tools for moving a set of ILCD packages onto location-specific flow
//! identities and back:
//!
//! - **Mapping table**: `(old_id, location) -> new_id` rows read from CSV, see [`mapping`]
//! - **Reference rewriting**: flow references in process and LCIA method data
//!   sets, see [`rewrite`]
//! - **Flow generation**: derived flow data sets for every mapping a package
//!   uses, see [`generate`]
//! - **Package pipeline**: the ordered passes over one package, see [`pipeline`]
//!
//! See [`runner`] for processing a whole working directory.

#![allow(clippy::too_many_arguments)]

pub mod args;
pub mod generate;
pub mod mapping;
pub mod pipeline;
pub mod report;
pub mod rewrite;
pub mod runner;
pub mod utils;

pub use mapping::{Direction, MappingEntry, MappingTable, UsageStats};
pub use pipeline::ArchivePipeline;
pub use report::{ArchiveReport, ArchiveStatus, RunSummary};
pub use runner::{run, MissingSourcePolicy, RunConfig};
