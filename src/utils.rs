use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name prefix of every package this tool writes.
pub const OUTPUT_PREFIX: &str = "peflocus_";

/// Zip packages directly inside `dir`, sorted by file name.
///
/// Sub-directories, non-zip files and previous outputs (`peflocus_*`) are
/// skipped.
pub fn list_packages(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir =
        fs::read_dir(dir).with_context(|| format!("failed to read directory {}", dir.display()))?;

    let mut packages = Vec::new();
    for entry in read_dir {
        let entry = entry.with_context(|| format!("failed to read directory {}", dir.display()))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_dir() {
            debug!(path = %path.display(), "skip directory");
            continue;
        }
        if !name.to_ascii_lowercase().ends_with(".zip") {
            debug!(file = name, "skip non-zip file");
            continue;
        }
        if name.starts_with(OUTPUT_PREFIX) {
            debug!(file = name, "skip output package");
            continue;
        }
        packages.push(path);
    }
    packages.sort();
    Ok(packages)
}

/// Delete `path` if it exists. A missing file is not an error.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed existing file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to delete {}", path.display())),
    }
}
