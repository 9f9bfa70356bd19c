//! Zip package and working directory helpers.

use anyhow::Result;
use ilcd_archive::{ArchiveSink, ArchiveSource, ZipReader, ZipWriter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::fixtures::MAPPING_CSV;

/// Write a zip package with the given `(path, content)` entries.
pub fn write_package(path: &Path, entries: &[(&str, String)]) -> Result<()> {
    let mut writer = ZipWriter::create(path)?;
    for (name, content) in entries {
        writer.write_entry(name, content.as_bytes())?;
    }
    writer.finish()
}

/// Read every entry of a zip package as UTF-8 text, keyed by path.
pub fn read_package(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut reader = ZipReader::open(path)?;
    let entries = reader.entries().to_vec();
    let mut out = BTreeMap::new();
    for entry in &entries {
        let bytes = reader.read(entry)?;
        out.insert(entry.path.clone(), String::from_utf8(bytes)?);
    }
    Ok(out)
}

/// A scratch directory holding a `zips/` working directory and a mapping file.
pub struct Workdir {
    temp_dir: TempDir,
}

impl Workdir {
    pub fn new() -> Result<Self> {
        Self::with_mapping(MAPPING_CSV)
    }

    pub fn with_mapping(csv: &str) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        std::fs::create_dir(temp_dir.path().join("zips"))?;
        std::fs::write(temp_dir.path().join("flow_mapping.csv"), csv)?;
        Ok(Self { temp_dir })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn zips(&self) -> PathBuf {
        self.root().join("zips")
    }

    pub fn mapping_file(&self) -> PathBuf {
        self.root().join("flow_mapping.csv")
    }

    pub fn package(&self, name: &str) -> PathBuf {
        self.zips().join(name)
    }
}
