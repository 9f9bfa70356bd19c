//! Per-package reports and the run summary.

use serde::Serialize;
use std::path::PathBuf;

use crate::mapping::Direction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    #[default]
    Completed,
    Failed,
}

/// Outcome of processing one package.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveReport {
    pub archive: String,
    pub output: Option<String>,
    pub status: ArchiveStatus,
    /// Cause of an archive-level failure.
    pub error: Option<String>,
    /// Process and LCIA method data sets rewritten.
    pub rewritten: usize,
    /// Other entries copied unchanged.
    pub copied: usize,
    /// Entries that could not be read, rewritten, derived or written.
    pub failed: usize,
    /// Flow data sets generated for used mappings.
    pub generated: usize,
    /// Flow data sets copied because an unmapped reference points at them.
    pub copied_untouched: usize,
    /// Input flow data sets not carried into the output.
    pub dropped: usize,
    pub mapped_references: usize,
    pub untouched_references: usize,
    /// Target ids whose source flow was missing.
    pub dangling: Vec<String>,
}

impl ArchiveReport {
    pub fn new(archive: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            ..Default::default()
        }
    }

    pub fn fail(&mut self, error: &anyhow::Error) {
        self.status = ArchiveStatus::Failed;
        self.error = Some(format!("{:#}", error));
    }

    pub fn is_failed(&self) -> bool {
        self.status == ArchiveStatus::Failed
    }
}

/// Everything a run did, in package order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub direction: Direction,
    pub workdir: PathBuf,
    pub mapping_file: PathBuf,
    pub mappings: usize,
    pub archives: Vec<ArchiveReport>,
}

impl RunSummary {
    pub fn failed_archives(&self) -> usize {
        self.archives.iter().filter(|a| a.is_failed()).count()
    }

    pub fn total_generated(&self) -> usize {
        self.archives.iter().map(|a| a.generated).sum()
    }

    pub fn total_dangling(&self) -> usize {
        self.archives.iter().map(|a| a.dangling.len()).sum()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Human-readable summary; `verbose` lists dangling ids.
    pub fn format_human(&self, verbose: bool) -> String {
        let mut out = String::new();
        let verb = match self.direction {
            Direction::Apply => "Mapped",
            Direction::Reverse => "Unmapped",
        };
        out.push_str(&format!(
            "{} {} package(s) in {} using {} mapping(s)\n",
            verb,
            self.archives.len(),
            self.workdir.display(),
            self.mappings
        ));

        for report in &self.archives {
            match report.status {
                ArchiveStatus::Completed => out.push_str(&format!(
                    "\x1b[32m✓\x1b[0m {} -> {}\n",
                    report.archive,
                    report.output.as_deref().unwrap_or("-")
                )),
                ArchiveStatus::Failed => out.push_str(&format!(
                    "\x1b[31m✗\x1b[0m {}: {}\n",
                    report.archive,
                    report.error.as_deref().unwrap_or("unknown error")
                )),
            }
            out.push_str(&format!(
                "    rewritten {}, copied {}, generated {}, untouched {}, dropped {}, failed {}\n",
                report.rewritten,
                report.copied,
                report.generated,
                report.copied_untouched,
                report.dropped,
                report.failed
            ));
            out.push_str(&format!(
                "    references: {} mapped, {} untouched\n",
                report.mapped_references, report.untouched_references
            ));
            if !report.dangling.is_empty() {
                out.push_str(&format!("    dangling: {}\n", report.dangling.len()));
                if verbose {
                    for id in &report.dangling {
                        out.push_str(&format!("      {}\n", id));
                    }
                }
            }
        }

        let failed = self.failed_archives();
        if failed > 0 {
            out.push_str(&format!("\x1b[31m{} package(s) failed\x1b[0m\n", failed));
        }
        out
    }
}
