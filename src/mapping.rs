//! Flow mapping table and per-package usage statistics.
//!
//! The table is loaded once per run and is read-only afterwards. Everything a
//! package run mutates lives in [`UsageStats`], which the pipeline owns and
//! resets between packages.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Forward lookup key: `lowercase(trim(location) + "/" + trim(old_id))`.
///
/// The location may be empty, giving `/<old_id>`.
pub fn mapping_key(location: &str, old_id: &str) -> String {
    format!("{}/{}", location.trim(), old_id.trim()).to_lowercase()
}

/// Which way identifiers are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Old identifiers to new, location-qualified identifiers.
    Apply,
    /// New identifiers back to the old ones, restoring the location.
    Reverse,
}

impl Direction {
    /// Resolve a key recorded in [`UsageStats::used`] for this direction.
    ///
    /// Apply records mapping keys, reverse records new identifiers.
    pub fn used_entry<'a>(self, table: &'a MappingTable, key: &str) -> Option<&'a MappingEntry> {
        match self {
            Direction::Apply => table.lookup_key(key),
            Direction::Reverse => table.lookup_reverse(key),
        }
    }
}

/// One row of the mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub location: String,
    pub old_id: String,
    pub new_id: String,
}

impl MappingEntry {
    pub fn new(old_id: &str, location: &str, new_id: &str) -> Self {
        Self {
            location: location.trim().to_string(),
            old_id: old_id.trim().to_string(),
            new_id: new_id.trim().to_string(),
        }
    }

    pub fn key(&self) -> String {
        mapping_key(&self.location, &self.old_id)
    }
}

/// Forward and reverse indexes over the mapping rows.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    /// mapping key -> entry
    forward: HashMap<String, MappingEntry>,
    /// new id -> entry
    reverse: HashMap<String, MappingEntry>,
}

impl MappingTable {
    /// Read the mapping CSV at `path` (`old_id, location, new_id`, one header row).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(file = %path.display(), "read flow mappings");
        let file = File::open(path)
            .with_context(|| format!("failed to read mapping file {}", path.display()))?;
        let table = Self::from_reader(file)
            .with_context(|| format!("failed to read mapping file {}", path.display()))?;
        info!(mappings = table.len(), "read flow mappings done");
        Ok(table)
    }

    /// Parse mapping rows from CSV. The first row is a header and is skipped.
    ///
    /// Rows with fewer than three fields, or with an empty old or new id, are
    /// skipped with a warning. A malformed CSV stream is an error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut table = Self::default();
        for (i, record) in csv.records().enumerate() {
            // row 0 is the header
            let row = i + 1;
            let record = record.with_context(|| format!("parse mapping row {}", row))?;
            if record.len() < 3 {
                warn!(row, fields = record.len(), "invalid flow mapping, row skipped");
                continue;
            }
            let entry = MappingEntry::new(&record[0], &record[1], &record[2]);
            if entry.old_id.is_empty() || entry.new_id.is_empty() {
                warn!(row, "flow mapping without old or new id, row skipped");
                continue;
            }
            table.insert(entry);
        }
        Ok(table)
    }

    /// Add an entry; a duplicate key or new id replaces the earlier row.
    pub fn insert(&mut self, entry: MappingEntry) {
        let key = entry.key();
        if let Some(previous) = self.forward.insert(key.clone(), entry.clone()) {
            warn!(key = %key, previous = %previous.new_id, current = %entry.new_id,
                "duplicate flow mapping key, last row wins");
        }
        if let Some(previous) = self.reverse.insert(entry.new_id.clone(), entry) {
            warn!(new_id = %previous.new_id, previous = %previous.key(),
                "duplicate new flow id, last row wins");
        }
    }

    pub fn lookup_forward(&self, old_id: &str, location: &str) -> Option<&MappingEntry> {
        self.lookup_key(&mapping_key(location, old_id))
    }

    pub fn lookup_key(&self, key: &str) -> Option<&MappingEntry> {
        self.forward.get(key)
    }

    pub fn lookup_reverse(&self, new_id: &str) -> Option<&MappingEntry> {
        self.reverse.get(new_id.trim())
    }

    /// Number of distinct forward keys.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &MappingEntry> {
        self.forward.values()
    }
}

/// Mapping usage collected while rewriting one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageStats {
    /// Apply: mapping keys; reverse: new ids.
    used: BTreeSet<String>,
    /// Referenced flow ids without a mapping; copied through unchanged.
    untouched: BTreeSet<String>,
    mapped_sites: usize,
    untouched_sites: usize,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_used(&mut self, key: impl Into<String>) {
        self.mapped_sites += 1;
        self.used.insert(key.into());
    }

    pub fn mark_untouched(&mut self, id: impl Into<String>) {
        self.untouched_sites += 1;
        self.untouched.insert(id.into());
    }

    /// Clear everything; called once per package after its output is written.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn used(&self) -> &BTreeSet<String> {
        &self.used
    }

    pub fn untouched(&self) -> &BTreeSet<String> {
        &self.untouched
    }

    pub fn is_used(&self, key: &str) -> bool {
        self.used.contains(key)
    }

    pub fn is_untouched(&self, id: &str) -> bool {
        self.untouched.contains(id)
    }

    /// Reference sites rewritten through a mapping.
    pub fn mapped_sites(&self) -> usize {
        self.mapped_sites
    }

    /// Reference sites left unchanged for lack of a mapping.
    pub fn untouched_sites(&self) -> usize {
        self.untouched_sites
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty() && self.untouched.is_empty()
    }
}
