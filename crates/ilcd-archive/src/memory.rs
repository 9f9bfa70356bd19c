//! In-memory package.

use anyhow::{anyhow, Result};

use crate::paths::classify;
use crate::{ArchiveEntry, ArchiveSink, ArchiveSource};

/// A package held in memory. Usable as both source and sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: Vec<ArchiveEntry>,
    data: Vec<Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces an existing entry with the same path.
    pub fn with_entry(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        match self.entries.iter().position(|e| e.path == path) {
            Some(index) => self.data[index] = data,
            None => self.push(path, data),
        }
        self
    }

    fn push(&mut self, path: &str, data: Vec<u8>) {
        self.entries.push(ArchiveEntry {
            index: self.data.len(),
            path: path.to_string(),
            kind: classify(path),
        });
        self.data.push(data);
    }

    /// Bytes of the entry at `path`.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| self.data[e.index].as_slice())
    }

    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArchiveSource for MemoryArchive {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn read(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        self.data
            .get(entry.index)
            .cloned()
            .ok_or_else(|| anyhow!("no entry #{} ({})", entry.index, entry.path))
    }
}

impl ArchiveSink for MemoryArchive {
    fn write_entry(&mut self, path: &str, data: &[u8]) -> Result<()> {
        if self.get(path).is_some() {
            return Err(anyhow!("duplicate entry {}", path));
        }
        self.push(path, data.to_vec());
        Ok(())
    }
}
