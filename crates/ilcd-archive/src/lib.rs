//! Access to ILCD data set packages.
//!
//! This crate provides:
//! - [`classify`]: path-based classification of package entries into [`EntryKind`]
//! - [`ArchiveSource`] / [`ArchiveSink`]: the narrow read/write contract used by
//!   package transformations
//! - [`ZipReader`] / [`ZipWriter`]: zip-backed implementations
//! - [`MemoryArchive`]: an in-memory implementation of both sides

pub mod memory;
pub mod paths;
pub mod zipfile;

pub use memory::MemoryArchive;
pub use paths::{classify, data_set_file_matches, flow_folder_prefix, DataSetType, EntryKind};
pub use zipfile::{ZipReader, ZipWriter};

use anyhow::Result;

/// A file entry of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the underlying archive.
    pub index: usize,
    pub path: String,
    pub kind: EntryKind,
}

/// Read side of a package.
pub trait ArchiveSource {
    /// File entries in archive order. Directory entries are not listed.
    fn entries(&self) -> &[ArchiveEntry];

    /// Read the raw bytes of an entry.
    fn read(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>>;

    /// Find the data set of the given type whose file is named after `id`
    /// (`<id>.xml` or `<id>_<version>.xml`).
    fn find_data_set(&self, data_set_type: DataSetType, id: &str) -> Option<ArchiveEntry> {
        self.entries()
            .iter()
            .find(|entry| {
                entry.kind.data_set_type() == Some(data_set_type)
                    && data_set_file_matches(&entry.path, id)
            })
            .cloned()
    }
}

/// Write side of a package.
pub trait ArchiveSink {
    /// Add an entry. Writing the same path twice is an error.
    fn write_entry(&mut self, path: &str, data: &[u8]) -> Result<()>;
}
