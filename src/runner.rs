//! Batch runner over a working directory of packages.
//!
//! Every `*.zip` in the working directory is transformed into a sibling
//! output package. A failing package is reported and the run moves on to the
//! next one; only an unreadable mapping file or working directory stops the
//! whole run.

use anyhow::{anyhow, Result};
use ilcd_archive::{ZipReader, ZipWriter};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::mapping::{Direction, MappingTable};
use crate::pipeline::ArchivePipeline;
use crate::report::{ArchiveReport, RunSummary};
use crate::utils::{list_packages, remove_if_exists, OUTPUT_PREFIX};

pub const DEFAULT_WORKDIR: &str = "zips";
pub const DEFAULT_MAPPING_FILE: &str = "flow_mapping.csv";

/// What to do when a used mapping's source flow is not in the package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingSourcePolicy {
    /// Keep the output; the reference is left dangling and reported.
    #[default]
    Degrade,
    /// Mark the package failed and remove its output.
    FailArchive,
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub direction: Direction,
    pub workdir: PathBuf,
    pub mapping_file: PathBuf,
    pub missing_source: MissingSourcePolicy,
}

impl RunConfig {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            workdir: PathBuf::from(DEFAULT_WORKDIR),
            mapping_file: PathBuf::from(DEFAULT_MAPPING_FILE),
            missing_source: MissingSourcePolicy::default(),
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_mapping_file(mut self, mapping_file: impl Into<PathBuf>) -> Self {
        self.mapping_file = mapping_file.into();
        self
    }

    pub fn with_missing_source(mut self, policy: MissingSourcePolicy) -> Self {
        self.missing_source = policy;
        self
    }
}

/// Output file name for an input package.
pub fn output_file_name(direction: Direction, input: &str) -> String {
    match direction {
        Direction::Apply => format!("{}{}", OUTPUT_PREFIX, input),
        Direction::Reverse => format!("{}unmapped_{}", OUTPUT_PREFIX, input),
    }
}

/// Transform every package in the working directory.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let table = MappingTable::load(&config.mapping_file)?;
    let packages = list_packages(&config.workdir)?;
    info!(
        workdir = %config.workdir.display(),
        packages = packages.len(),
        direction = ?config.direction,
        "start run"
    );

    let mut pipeline = ArchivePipeline::new(&table, config.direction);
    let mut archives = Vec::with_capacity(packages.len());
    for path in &packages {
        archives.push(run_package(config, &mut pipeline, path));
    }

    let summary = RunSummary {
        direction: config.direction,
        workdir: config.workdir.clone(),
        mapping_file: config.mapping_file.clone(),
        mappings: table.len(),
        archives,
    };
    info!(
        packages = summary.archives.len(),
        failed = summary.failed_archives(),
        "run done"
    );
    Ok(summary)
}

fn run_package(config: &RunConfig, pipeline: &mut ArchivePipeline<'_>, input: &Path) -> ArchiveReport {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let output = config
        .workdir
        .join(output_file_name(config.direction, &name));

    match process_package(config, pipeline, &name, input, &output) {
        Ok(report) => report,
        Err(e) => {
            error!(archive = %name, "package failed: {:#}", e);
            let mut report = ArchiveReport::new(name);
            report.fail(&e);
            report
        }
    }
}

fn process_package(
    config: &RunConfig,
    pipeline: &mut ArchivePipeline<'_>,
    name: &str,
    input: &Path,
    output: &Path,
) -> Result<ArchiveReport> {
    let mut source = ZipReader::open(input)?;
    remove_if_exists(output)?;
    let mut sink = ZipWriter::create(output)?;

    let mut report = pipeline.process(name, &mut source, &mut sink);
    report.output = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    if let Err(e) = sink.finish() {
        warn!(archive = name, "could not close output package: {:#}", e);
    }
    drop(source);

    if config.missing_source == MissingSourcePolicy::FailArchive && !report.dangling.is_empty() {
        remove_if_exists(output)?;
        report.output = None;
        report.fail(&anyhow!(
            "source flow missing for {} generated flow(s): {}",
            report.dangling.len(),
            report.dangling.join(", ")
        ));
        error!(archive = name, dangling = report.dangling.len(), "package failed, output removed");
    }
    Ok(report)
}
