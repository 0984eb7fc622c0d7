// SPDX-License-Identifier: Apache-2.0

//! File identity based on device + inode.
//!
//! Captured when a file starts being followed so that rotation (same path,
//! new inode) is distinguishable from truncation (same inode, smaller size).

use std::fs::File;
use std::io;

/// A unique identifier for a file that stays stable across renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    #[cfg(unix)]
    pub fn from_file(file: &File) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = file.metadata()?;
        Ok(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn from_file(file: &File) -> io::Result<Self> {
        // No stable identity available; fall back to creation time + length.
        let metadata = file.metadata()?;
        let created = metadata
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Ok(Self {
            dev: created,
            ino: metadata.len(),
        })
    }

    pub fn dev(&self) -> u64 {
        self.dev
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn same_file_same_id() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"content").unwrap();
        file.flush().unwrap();

        let f1 = File::open(file.path()).unwrap();
        let f2 = File::open(file.path()).unwrap();

        assert_eq!(
            FileId::from_file(&f1).unwrap(),
            FileId::from_file(&f2).unwrap()
        );
    }

    #[test]
    fn different_files_different_ids() {
        let file1 = NamedTempFile::new().unwrap();
        let file2 = NamedTempFile::new().unwrap();

        let id1 = FileId::from_file(&File::open(file1.path()).unwrap()).unwrap();
        let id2 = FileId::from_file(&File::open(file2.path()).unwrap()).unwrap();

        assert_ne!(id1, id2);
    }

    #[test]
    fn id_survives_rename() {
        let dir = tempfile::TempDir::new().unwrap();
        let original = dir.path().join("app.log");
        std::fs::write(&original, b"log data").unwrap();

        let id_before = FileId::from_file(&File::open(&original).unwrap()).unwrap();

        let rotated = dir.path().join("app.log.1");
        std::fs::rename(&original, &rotated).unwrap();

        let id_after = FileId::from_file(&File::open(&rotated).unwrap()).unwrap();
        assert_eq!(id_before, id_after);
    }
}
