//! Generation of target flow data sets for mappings used in a package.

use anyhow::{anyhow, Context, Result};
use ilcd_archive::{ArchiveSink, ArchiveSource, DataSetType};
use ilcd_doc::{Document, TreeNode, FLOW_BASE_NAME_PATH, FLOW_UUID_PATH};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::mapping::{Direction, MappingEntry, MappingTable, UsageStats};

const NAME_SEPARATOR: &str = " - ";

/// What to generate for one used mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTarget {
    pub source_id: String,
    pub target_id: String,
    /// Location appended to the names; empty means strip a location suffix.
    pub location: String,
}

impl GenerationTarget {
    pub fn new(direction: Direction, entry: &MappingEntry) -> Self {
        match direction {
            Direction::Apply => Self {
                source_id: entry.old_id.clone(),
                target_id: entry.new_id.clone(),
                location: entry.location.clone(),
            },
            Direction::Reverse => Self {
                source_id: entry.new_id.clone(),
                target_id: entry.old_id.clone(),
                location: String::new(),
            },
        }
    }
}

/// Adjust a flow base name for a target location.
///
/// A non-empty location is appended as `"<name> - <location>"`. An empty
/// location strips everything from the last `" - "`, unless the name starts
/// with it.
pub fn adjust_base_name(name: &str, location: &str) -> String {
    if !location.is_empty() {
        return format!("{}{}{}", name, NAME_SEPARATOR, location);
    }
    match name.rfind(NAME_SEPARATOR) {
        Some(pos) if pos > 0 => name[..pos].to_string(),
        _ => name.to_string(),
    }
}

/// Clone a flow data set under a new identity.
///
/// Only the UUID and the base names change; everything else is written back
/// as parsed.
pub fn derive_flow(source: &[u8], target_id: &str, location: &str) -> Result<Vec<u8>> {
    let mut doc = Document::parse(source).context("parse flow data set")?;
    let root = doc.root_mut();
    if root.local_name() != "flowDataSet" {
        return Err(anyhow!("expected <flowDataSet>, found <{}>", root.local_name()));
    }
    let uuid = root
        .find_mut(FLOW_UUID_PATH)
        .ok_or_else(|| anyhow!("flow data set has no UUID"))?;
    uuid.set_text(target_id);

    for name in root.find_all_mut(FLOW_BASE_NAME_PATH) {
        let adjusted = adjust_base_name(name.text().trim(), location);
        name.set_text(&adjusted);
    }
    doc.to_bytes().context("serialize flow data set")
}

enum Outcome {
    Written,
    MissingSource,
}

/// Writes one flow data set per distinct target used in a package.
///
/// One generator is used per package; targets it has already written are
/// never written again.
pub struct DocumentGenerator<'a> {
    table: &'a MappingTable,
    direction: Direction,
    flow_folder: String,
    generated: BTreeSet<String>,
    dangling: BTreeSet<String>,
    failed: usize,
}

impl<'a> DocumentGenerator<'a> {
    /// `flow_folder` is the package prefix up to and including `flows/`.
    pub fn new(table: &'a MappingTable, direction: Direction, flow_folder: impl Into<String>) -> Self {
        Self {
            table,
            direction,
            flow_folder: flow_folder.into(),
            generated: BTreeSet::new(),
            dangling: BTreeSet::new(),
            failed: 0,
        }
    }

    /// Generate targets for every used key. Returns the number written by this call.
    pub fn generate<S, W>(&mut self, stats: &UsageStats, source: &mut S, sink: &mut W) -> usize
    where
        S: ArchiveSource,
        W: ArchiveSink,
    {
        info!(used = stats.used().len(), "generate mapped flows");
        let mut written = 0;
        for key in stats.used() {
            let Some(entry) = self.direction.used_entry(self.table, key) else {
                warn!(key = %key, "used key has no mapping entry");
                continue;
            };
            let target = GenerationTarget::new(self.direction, entry);
            if self.generated.contains(&target.target_id) {
                debug!(target_id = %target.target_id, "flow already generated");
                continue;
            }
            match self.generate_one(&target, source, sink) {
                Ok(Outcome::Written) => {
                    self.dangling.remove(&target.target_id);
                    self.generated.insert(target.target_id);
                    written += 1;
                }
                Ok(Outcome::MissingSource) => {
                    self.dangling.insert(target.target_id);
                }
                Err(e) => {
                    warn!(source_id = %target.source_id, target_id = %target.target_id,
                        "could not generate flow: {:#}", e);
                    self.failed += 1;
                }
            }
        }
        info!(generated = written, "generate mapped flows done");
        written
    }

    fn generate_one<S, W>(&self, target: &GenerationTarget, source: &mut S, sink: &mut W) -> Result<Outcome>
    where
        S: ArchiveSource,
        W: ArchiveSink,
    {
        let Some(entry) = source.find_data_set(DataSetType::Flow, &target.source_id) else {
            warn!(source_id = %target.source_id, target_id = %target.target_id,
                "source flow not found, reference left dangling");
            return Ok(Outcome::MissingSource);
        };
        let bytes = match source.read(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %entry.path, target_id = %target.target_id,
                    "source flow unreadable, reference left dangling: {:#}", e);
                return Ok(Outcome::MissingSource);
            }
        };

        let derived = derive_flow(&bytes, &target.target_id, &target.location)
            .with_context(|| format!("derive {} from {}", target.target_id, entry.path))?;
        let path = format!("{}{}.xml", self.flow_folder, target.target_id);
        sink.write_entry(&path, &derived)?;
        debug!(from = %entry.path, path = %path, "generated flow");
        Ok(Outcome::Written)
    }

    /// Target ids written so far.
    pub fn generated(&self) -> &BTreeSet<String> {
        &self.generated
    }

    /// Target ids never written because every source flow tried was missing
    /// or unreadable.
    pub fn dangling(&self) -> &BTreeSet<String> {
        &self.dangling
    }

    /// Targets whose source could be read but not derived or written.
    pub fn failed(&self) -> usize {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilcd_archive::MemoryArchive;

    fn flow(uuid: &str, name: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<flowDataSet xmlns="http://lca.jrc.it/ILCD/Flow" xmlns:common="http://lca.jrc.it/ILCD/Common">
  <flowInformation>
    <dataSetInformation>
      <common:UUID>{uuid}</common:UUID>
      <name>
        <baseName xml:lang="en">{name}</baseName>
        <baseName xml:lang="de">{name}</baseName>
      </name>
    </dataSetInformation>
  </flowInformation>
</flowDataSet>"#
        )
    }

    fn table() -> MappingTable {
        let mut table = MappingTable::default();
        table.insert(MappingEntry::new("F1", "DE", "F1-DE"));
        table.insert(MappingEntry::new("F1", "FR", "F1-FR"));
        table.insert(MappingEntry::new("F7", "DE", "F7-DE"));
        table
    }

    fn base_names(bytes: &[u8]) -> Vec<String> {
        let doc = Document::parse(bytes).expect("parse generated flow");
        doc.root()
            .find_all(FLOW_BASE_NAME_PATH)
            .into_iter()
            .map(|n| n.text())
            .collect()
    }

    #[test]
    fn test_adjust_base_name() {
        assert_eq!(adjust_base_name("steel", "DE"), "steel - DE");
        assert_eq!(adjust_base_name("steel - DE", ""), "steel");
        assert_eq!(adjust_base_name("a - b - DE", ""), "a - b");
        assert_eq!(adjust_base_name(" - DE", ""), " - DE");
        assert_eq!(adjust_base_name("steel", ""), "steel");
        assert_eq!(adjust_base_name(&adjust_base_name("steel", "DE"), ""), "steel");
    }

    #[test]
    fn test_apply_generates_located_copies() -> Result<()> {
        let table = table();
        let mut source = MemoryArchive::new()
            .with_entry("ILCD/flows/F1_01.00.000.xml", flow("F1", "steel"));
        let mut sink = MemoryArchive::new();
        let mut stats = UsageStats::new();
        stats.mark_used("de/f1");
        stats.mark_used("fr/f1");

        let mut generator = DocumentGenerator::new(&table, Direction::Apply, "ILCD/flows/");
        assert_eq!(generator.generate(&stats, &mut source, &mut sink), 2);

        assert_eq!(sink.paths(), vec!["ILCD/flows/F1-DE.xml", "ILCD/flows/F1-FR.xml"]);
        let de = sink.get("ILCD/flows/F1-DE.xml").expect("F1-DE");
        let doc = Document::parse(de)?;
        let uuid = doc.root().find(FLOW_UUID_PATH).map(|n| n.text());
        assert_eq!(uuid.as_deref(), Some("F1-DE"));
        assert_eq!(base_names(de), vec!["steel - DE", "steel - DE"]);
        Ok(())
    }

    #[test]
    fn test_reverse_generates_original_identity() -> Result<()> {
        let table = table();
        let mut source = MemoryArchive::new()
            .with_entry("data/flows/F1-DE.xml", flow("F1-DE", "steel - DE"));
        let mut sink = MemoryArchive::new();
        let mut stats = UsageStats::new();
        stats.mark_used("F1-DE");

        let mut generator = DocumentGenerator::new(&table, Direction::Reverse, "data/flows/");
        assert_eq!(generator.generate(&stats, &mut source, &mut sink), 1);

        let restored = sink.get("data/flows/F1.xml").expect("F1");
        assert_eq!(base_names(restored), vec!["steel", "steel"]);
        assert!(String::from_utf8(restored.to_vec())?.contains("<common:UUID>F1</common:UUID>"));
        Ok(())
    }

    #[test]
    fn test_generation_is_idempotent() {
        let table = table();
        let mut source = MemoryArchive::new().with_entry("ILCD/flows/F1.xml", flow("F1", "steel"));
        let mut sink = MemoryArchive::new();
        let mut stats = UsageStats::new();
        stats.mark_used("de/f1");

        let mut generator = DocumentGenerator::new(&table, Direction::Apply, "ILCD/flows/");
        assert_eq!(generator.generate(&stats, &mut source, &mut sink), 1);
        assert_eq!(generator.generate(&stats, &mut source, &mut sink), 0);
        assert_eq!(sink.len(), 1);
        assert_eq!(generator.failed(), 0);
    }

    #[test]
    fn test_missing_source_is_dangling() {
        let table = table();
        let mut source = MemoryArchive::new().with_entry("ILCD/flows/F1.xml", flow("F1", "steel"));
        let mut sink = MemoryArchive::new();
        let mut stats = UsageStats::new();
        stats.mark_used("de/f7");
        stats.mark_used("de/f1");

        let mut generator = DocumentGenerator::new(&table, Direction::Apply, "ILCD/flows/");
        assert_eq!(generator.generate(&stats, &mut source, &mut sink), 1);
        assert!(generator.dangling().contains("F7-DE"));
        assert!(generator.generated().contains("F1-DE"));
        assert_eq!(sink.paths(), vec!["ILCD/flows/F1-DE.xml"]);
    }

    #[test]
    fn test_target_generated_from_later_source_is_not_dangling() {
        let table = table();
        let mut source = MemoryArchive::new()
            .with_entry("ILCD/flows/F1-FR.xml", flow("F1-FR", "steel - FR"));
        let mut sink = MemoryArchive::new();
        let mut stats = UsageStats::new();
        stats.mark_used("F1-DE");
        stats.mark_used("F1-FR");

        let mut generator = DocumentGenerator::new(&table, Direction::Reverse, "ILCD/flows/");
        assert_eq!(generator.generate(&stats, &mut source, &mut sink), 1);
        assert!(generator.generated().contains("F1"));
        assert!(generator.dangling().is_empty());
        assert_eq!(sink.paths(), vec!["ILCD/flows/F1.xml"]);
    }

    #[test]
    fn test_write_failure_continues_with_next_target() {
        let table = table();
        let mut source = MemoryArchive::new().with_entry("ILCD/flows/F1.xml", flow("F1", "steel"));
        let mut sink = MemoryArchive::new().with_entry("ILCD/flows/F1-DE.xml", "<flowDataSet/>");
        let mut stats = UsageStats::new();
        stats.mark_used("de/f1");
        stats.mark_used("fr/f1");

        let mut generator = DocumentGenerator::new(&table, Direction::Apply, "ILCD/flows/");
        assert_eq!(generator.generate(&stats, &mut source, &mut sink), 1);
        assert_eq!(generator.failed(), 1);
        assert!(!generator.generated().contains("F1-DE"));
        assert!(generator.generated().contains("F1-FR"));
        assert!(generator.dangling().is_empty());
        assert_eq!(sink.get("ILCD/flows/F1-DE.xml"), Some(&b"<flowDataSet/>"[..]));
        assert!(sink.get("ILCD/flows/F1-FR.xml").is_some());
    }

    #[test]
    fn test_broken_source_is_counted_as_failed() {
        let table = table();
        let mut source = MemoryArchive::new()
            .with_entry("ILCD/flows/F1.xml", "<flowDataSet><flowInformation>");
        let mut sink = MemoryArchive::new();
        let mut stats = UsageStats::new();
        stats.mark_used("de/f1");

        let mut generator = DocumentGenerator::new(&table, Direction::Apply, "ILCD/flows/");
        assert_eq!(generator.generate(&stats, &mut source, &mut sink), 0);
        assert_eq!(generator.failed(), 1);
        assert!(generator.dangling().is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_flow_without_uuid_is_rejected() {
        let result = derive_flow(b"<flowDataSet><flowInformation/></flowDataSet>", "X", "");
        assert!(result.is_err());
        assert!(derive_flow(b"<processDataSet/>", "X", "").is_err());
    }
}
