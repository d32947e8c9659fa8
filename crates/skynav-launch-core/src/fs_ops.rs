use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::resolver::PackageManifest;

/// Append-only record of registry mutations, one per registry root.
pub const REGISTRY_JOURNAL_FILE_NAME: &str = ".registry.log";

#[derive(Debug, Error)]
pub enum FsError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A helper representing a scoped registry mutation.
pub struct MutationPhase<'a> {
    name: &'a str,
}

impl<'a> MutationPhase<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name }
    }
}

impl<'a> Drop for MutationPhase<'a> {
    fn drop(&mut self) {
        log::debug!("registry mutation '{}' completed", self.name);
    }
}

/// Safely write data to a path using a temporary file and atomic rename.
pub fn safe_write(path: &Path, data: &[u8], mode: u32) -> Result<(), FsError> {
    let parent = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent)?;

    let mut temp = parent.clone();
    temp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));

    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true).mode(mode);
    let mut file = opts.open(&temp)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp, path)?;
    Ok(())
}

/// Write a package manifest with explicit permissions.
pub fn write_manifest(path: &Path, manifest: &PackageManifest, mode: u32) -> Result<(), FsError> {
    let data = serde_json::to_vec_pretty(manifest).expect("manifest serialization");
    safe_write(path, &data, mode)
}

/// Append to a registry journal, creating it if it does not exist.
pub fn journal_append(path: &Path, line: &str, mode: u32) -> Result<(), FsError> {
    let mut opts = OpenOptions::new();
    opts.append(true).create(true).mode(mode);
    let mut file = opts.open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_write_replaces_content_atomically() {
        let dir = std::env::temp_dir().join(format!("skynav-fs-{}", uuid::Uuid::new_v4()));
        let path = dir.join("manifest.json");

        safe_write(&path, b"first", 0o644).unwrap();
        safe_write(&path, b"second", 0o644).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        // No temp files may survive a completed write.
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn journal_appends_one_line_per_mutation() {
        let dir = std::env::temp_dir().join(format!("skynav-fs-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let journal = dir.join(REGISTRY_JOURNAL_FILE_NAME);

        journal_append(&journal, "register skynav_gui 0.1.0", 0o644).unwrap();
        journal_append(&journal, "remove skynav_gui", 0o644).unwrap();

        let text = fs::read_to_string(&journal).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["register skynav_gui 0.1.0", "remove skynav_gui"]
        );
    }
}
