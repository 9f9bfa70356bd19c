//! The per-package transformation.
//!
//! A package is processed in strictly ordered passes:
//!
//! 1. rewrite: process and LCIA method data sets are rewritten in place, flows
//!    are set aside, everything else is copied unchanged
//! 2. generate: one flow data set per used mapping target
//! 3. copy untouched: flows still referenced without a mapping are copied
//!    under their canonical file name, all other input flows are dropped
//! 4. reset: usage statistics are cleared for the next package
//!
//! Opening and closing the underlying archives is left to the caller.

use anyhow::{Context, Result};
use ilcd_archive::{flow_folder_prefix, ArchiveEntry, ArchiveSink, ArchiveSource, EntryKind};
use ilcd_doc::FlowInfo;
use tracing::{debug, info, warn};

use crate::generate::DocumentGenerator;
use crate::mapping::{Direction, MappingTable, UsageStats};
use crate::report::ArchiveReport;
use crate::rewrite::ReferenceRewriter;

/// Flow folder used when a package has no flow data sets at all.
pub const DEFAULT_FLOW_FOLDER: &str = "ILCD/flows/";

pub struct ArchivePipeline<'a> {
    table: &'a MappingTable,
    direction: Direction,
    stats: UsageStats,
}

impl<'a> ArchivePipeline<'a> {
    pub fn new(table: &'a MappingTable, direction: Direction) -> Self {
        Self {
            table,
            direction,
            stats: UsageStats::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Usage collected so far for the package in progress.
    pub fn stats(&self) -> &UsageStats {
        &self.stats
    }

    /// Transform one package from `source` into `sink`.
    ///
    /// Individual entries that fail are logged and counted in the report; the
    /// remaining entries are still processed.
    pub fn process<S, W>(&mut self, name: &str, source: &mut S, sink: &mut W) -> ArchiveReport
    where
        S: ArchiveSource,
        W: ArchiveSink,
    {
        let mut report = ArchiveReport::new(name);
        let entries = source.entries().to_vec();
        info!(archive = name, entries = entries.len(), direction = ?self.direction, "process package");

        let flows = self.rewrite_pass(name, &entries, source, sink, &mut report);
        let flow_folder = flows
            .iter()
            .find_map(|entry| flow_folder_prefix(&entry.path))
            .unwrap_or_else(|| DEFAULT_FLOW_FOLDER.to_string());
        debug!(archive = name, flow_folder = %flow_folder, flows = flows.len(), "flow folder");

        let mut generator = DocumentGenerator::new(self.table, self.direction, flow_folder.as_str());
        report.generated = generator.generate(&self.stats, source, sink);
        report.failed += generator.failed();
        report.dangling = generator.dangling().iter().cloned().collect();
        for id in &report.dangling {
            warn!(archive = name, id = %id, "reference to flow that could not be generated");
        }

        self.copy_untouched_pass(name, &flows, &flow_folder, &generator, source, sink, &mut report);

        report.mapped_references = self.stats.mapped_sites();
        report.untouched_references = self.stats.untouched_sites();
        self.stats.reset();

        info!(
            archive = name,
            rewritten = report.rewritten,
            generated = report.generated,
            untouched = report.copied_untouched,
            failed = report.failed,
            "process package done"
        );
        report
    }

    /// Returns the flow entries, which are handled by the later passes.
    fn rewrite_pass<S, W>(
        &mut self,
        name: &str,
        entries: &[ArchiveEntry],
        source: &mut S,
        sink: &mut W,
        report: &mut ArchiveReport,
    ) -> Vec<ArchiveEntry>
    where
        S: ArchiveSource,
        W: ArchiveSink,
    {
        let mut flows = Vec::new();
        for entry in entries {
            let result = match entry.kind {
                EntryKind::Flow => {
                    flows.push(entry.clone());
                    continue;
                }
                EntryKind::Process | EntryKind::LciaMethod => self
                    .rewrite_entry(entry, source, sink)
                    .map(|()| report.rewritten += 1),
                _ => copy_entry(entry, source, sink).map(|()| report.copied += 1),
            };
            if let Err(e) = result {
                warn!(archive = name, path = %entry.path, "entry skipped: {:#}", e);
                report.failed += 1;
            }
        }
        flows
    }

    fn rewrite_entry<S, W>(&mut self, entry: &ArchiveEntry, source: &mut S, sink: &mut W) -> Result<()>
    where
        S: ArchiveSource,
        W: ArchiveSink,
    {
        let bytes = source.read(entry)?;
        let rewritten = ReferenceRewriter::new(self.table, &mut self.stats, self.direction)
            .rewrite(&bytes)
            .with_context(|| format!("rewrite {}", entry.path))?;
        sink.write_entry(&entry.path, &rewritten)
    }

    fn copy_untouched_pass<S, W>(
        &self,
        name: &str,
        flows: &[ArchiveEntry],
        flow_folder: &str,
        generator: &DocumentGenerator<'_>,
        source: &mut S,
        sink: &mut W,
        report: &mut ArchiveReport,
    ) where
        S: ArchiveSource,
        W: ArchiveSink,
    {
        for entry in flows {
            let result = source.read(entry).and_then(|bytes| {
                let info = FlowInfo::from_bytes(&bytes)
                    .with_context(|| format!("read flow identity of {}", entry.path))?;
                Ok((info, bytes))
            });
            let (info, bytes) = match result {
                Ok(flow) => flow,
                Err(e) => {
                    warn!(archive = name, path = %entry.path, "flow skipped: {:#}", e);
                    report.failed += 1;
                    continue;
                }
            };

            if !self.stats.is_untouched(&info.uuid) {
                debug!(archive = name, path = %entry.path, "flow not referenced untouched, dropped");
                report.dropped += 1;
                continue;
            }
            if generator.generated().contains(&info.uuid) {
                debug!(archive = name, uuid = %info.uuid, "flow already generated, copy skipped");
                report.dropped += 1;
                continue;
            }

            let path = format!("{}{}", flow_folder, info.file_name());
            match sink.write_entry(&path, &bytes) {
                Ok(()) => report.copied_untouched += 1,
                Err(e) => {
                    warn!(archive = name, path = %entry.path, "flow not copied: {:#}", e);
                    report.failed += 1;
                }
            }
        }
    }
}

fn copy_entry<S, W>(entry: &ArchiveEntry, source: &mut S, sink: &mut W) -> Result<()>
where
    S: ArchiveSource,
    W: ArchiveSink,
{
    let bytes = source.read(entry)?;
    sink.write_entry(&entry.path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingEntry;
    use ilcd_archive::MemoryArchive;

    fn flow(uuid: &str, version: &str, name: &str) -> String {
        format!(
            r#"<flowDataSet xmlns:common="http://lca.jrc.it/ILCD/Common"><flowInformation><dataSetInformation><common:UUID>{uuid}</common:UUID><name><baseName>{name}</baseName></name></dataSetInformation></flowInformation><administrativeInformation><publicationAndOwnership><common:dataSetVersion>{version}</common:dataSetVersion></publicationAndOwnership></administrativeInformation></flowDataSet>"#
        )
    }

    fn exchange(id: &str, location: Option<&str>) -> String {
        let location = location
            .map(|l| format!("<location>{}</location>", l))
            .unwrap_or_default();
        format!(
            r#"<exchange><referenceToFlowDataSet refObjectId="{id}" uri="../flows/{id}.xml"><common:shortDescription>n</common:shortDescription></referenceToFlowDataSet>{location}</exchange>"#
        )
    }

    fn process(exchanges: &[String]) -> String {
        format!(
            r#"<processDataSet xmlns:common="http://lca.jrc.it/ILCD/Common"><exchanges>{}</exchanges></processDataSet>"#,
            exchanges.concat()
        )
    }

    fn table() -> MappingTable {
        let mut table = MappingTable::default();
        table.insert(MappingEntry::new("F1", "DE", "F1-DE"));
        table
    }

    fn package() -> MemoryArchive {
        MemoryArchive::new()
            .with_entry(
                "ILCD/processes/P1.xml",
                process(&[exchange("F1", Some("DE")), exchange("F9", None)]),
            )
            .with_entry("ILCD/flows/F1_01.00.000.xml", flow("F1", "01.00.000", "steel"))
            .with_entry("ILCD/flows/F9_02.00.000.xml", flow("F9", "02.00.000", "water"))
            .with_entry("ILCD/flows/F5_01.00.000.xml", flow("F5", "01.00.000", "unused"))
            .with_entry("ILCD/stylesheets/flow.xsl", "xsl")
    }

    #[test]
    fn test_apply_package() {
        let table = table();
        let mut source = package();
        let mut sink = MemoryArchive::new();
        let mut pipeline = ArchivePipeline::new(&table, Direction::Apply);

        let report = pipeline.process("a.zip", &mut source, &mut sink);

        assert_eq!(
            sink.paths(),
            vec![
                "ILCD/processes/P1.xml",
                "ILCD/stylesheets/flow.xsl",
                "ILCD/flows/F1-DE.xml",
                "ILCD/flows/F9_02.00.000.xml",
            ]
        );
        assert_eq!(report.rewritten, 1);
        assert_eq!(report.copied, 1);
        assert_eq!(report.generated, 1);
        assert_eq!(report.copied_untouched, 1);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.mapped_references, 1);
        assert_eq!(report.untouched_references, 1);
        assert!(report.dangling.is_empty());
        assert!(pipeline.stats().is_empty());

        let xml = String::from_utf8_lossy(sink.get("ILCD/processes/P1.xml").expect("process"));
        assert!(xml.contains(r#"refObjectId="F1-DE" uri="../flows/F1-DE.xml""#));
        assert!(xml.contains(r#"refObjectId="F9""#));
    }

    #[test]
    fn test_reverse_package_restores_ids() {
        let table = table();
        let mut source = package();
        let mut mapped = MemoryArchive::new();
        ArchivePipeline::new(&table, Direction::Apply).process("a.zip", &mut source, &mut mapped);

        let mut restored = MemoryArchive::new();
        let report =
            ArchivePipeline::new(&table, Direction::Reverse).process("peflocus_a.zip", &mut mapped, &mut restored);

        assert_eq!(report.generated, 1);
        assert_eq!(report.copied_untouched, 1);
        assert!(restored.get("ILCD/flows/F1.xml").is_some());
        assert!(restored.get("ILCD/flows/F9_02.00.000.xml").is_some());
        let xml = String::from_utf8_lossy(restored.get("ILCD/processes/P1.xml").expect("process"));
        assert_eq!(
            xml,
            process(&[exchange("F1", Some("DE")), exchange("F9", None)])
        );
    }

    #[test]
    fn test_unparseable_process_is_counted_and_skipped() {
        let table = table();
        let mut source = package().with_entry("ILCD/processes/P2.xml", "<processDataSet><exchanges>");
        let mut sink = MemoryArchive::new();
        let report = ArchivePipeline::new(&table, Direction::Apply).process("a.zip", &mut source, &mut sink);

        assert_eq!(report.failed, 1);
        assert_eq!(report.rewritten, 1);
        assert!(sink.get("ILCD/processes/P2.xml").is_none());
        assert!(sink.get("ILCD/flows/F1-DE.xml").is_some());
    }

    #[test]
    fn test_missing_generation_source_is_reported() {
        let table = table();
        let mut source = MemoryArchive::new().with_entry(
            "ILCD/processes/P1.xml",
            process(&[exchange("F1", Some("DE"))]),
        );
        let mut sink = MemoryArchive::new();
        let report = ArchivePipeline::new(&table, Direction::Apply).process("a.zip", &mut source, &mut sink);

        assert_eq!(report.dangling, vec!["F1-DE".to_string()]);
        assert_eq!(report.generated, 0);
        assert_eq!(sink.paths(), vec!["ILCD/processes/P1.xml"]);
    }

    #[test]
    fn test_stats_are_isolated_between_packages() {
        let table = table();
        let mut pipeline = ArchivePipeline::new(&table, Direction::Apply);

        let mut first = package();
        let mut first_out = MemoryArchive::new();
        pipeline.process("a.zip", &mut first, &mut first_out);

        let mut second = MemoryArchive::new()
            .with_entry("ILCD/processes/P2.xml", process(&[exchange("F9", None)]))
            .with_entry("ILCD/flows/F1_01.00.000.xml", flow("F1", "01.00.000", "steel"))
            .with_entry("ILCD/flows/F9_02.00.000.xml", flow("F9", "02.00.000", "water"));
        let mut second_out = MemoryArchive::new();
        let report = pipeline.process("b.zip", &mut second, &mut second_out);

        assert_eq!(report.generated, 0);
        assert_eq!(report.copied_untouched, 1);
        assert!(second_out.get("ILCD/flows/F1-DE.xml").is_none());
    }
}
