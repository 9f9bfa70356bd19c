//! Zip-backed package reader and writer.

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive};

use crate::paths::classify;
use crate::{ArchiveEntry, ArchiveSink, ArchiveSource};

/// Upper bound on the buffer reserved up front from a declared entry size.
const MAX_PREALLOC: u64 = 1 << 20;

fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Reads entries from a zip package.
pub struct ZipReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    entries: Vec<ArchiveEntry>,
}

impl ZipReader {
    /// Open a zip package and index its file entries.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("read zip directory of {}", path.display()))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive
                .by_index_raw(index)
                .with_context(|| format!("read entry #{} of {}", index, path.display()))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            entries.push(ArchiveEntry {
                index,
                kind: classify(&name),
                path: name,
            });
        }

        debug!(path = %path.display(), entries = entries.len(), "indexed package");
        Ok(Self {
            path,
            archive,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArchiveSource for ZipReader {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn read(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_index(entry.index)
            .with_context(|| format!("open entry {}", entry.path))?;
        let mut data = Vec::with_capacity(initial_capacity(file.size()));
        file.read_to_end(&mut data)
            .with_context(|| format!("read entry {}", entry.path))?;
        Ok(data)
    }
}

/// Writes entries into a new zip package.
pub struct ZipWriter {
    path: PathBuf,
    inner: zip::ZipWriter<File>,
    written: HashSet<String>,
}

impl ZipWriter {
    /// Create the package file, truncating an existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self {
            path,
            inner: zip::ZipWriter::new(file),
            written: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// Write the central directory and close the file.
    pub fn finish(self) -> Result<()> {
        self.inner
            .finish()
            .with_context(|| format!("finish {}", self.path.display()))?;
        Ok(())
    }
}

impl ArchiveSink for ZipWriter {
    fn write_entry(&mut self, path: &str, data: &[u8]) -> Result<()> {
        if self.written.contains(path) {
            return Err(anyhow!("duplicate entry {}", path));
        }
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.inner
            .start_file(path, options)
            .with_context(|| format!("start entry {}", path))?;
        self.inner
            .write_all(data)
            .with_context(|| format!("write entry {}", path))?;
        self.written.insert(path.to_string());
        Ok(())
    }
}
