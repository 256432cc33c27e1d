//! Local directory transport

use super::FileTransport;
use fileshipper_common::{Result, ShipperError};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

/// Files already resident in a local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTransport {
    basedir: PathBuf,
}

impl LocalTransport {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
        }
    }
}

impl FileTransport for LocalTransport {
    /// Regular files (symlinks followed), hidden files excluded
    fn list_files(&self) -> Result<BTreeSet<String>> {
        let entries =
            std::fs::read_dir(&self.basedir).map_err(|e| ShipperError::io_at(&self.basedir, e))?;

        let mut files = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| ShipperError::io_at(&self.basedir, e))?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if !name.starts_with('.') => {
                    files.insert(name);
                },
                Ok(_) => {},
                Err(name) => debug!(file = ?name, "Skipping file with non UTF-8 name"),
            }
        }

        Ok(files)
    }

    fn download(&self, _file_name: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_visible_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.csv"), "").unwrap();
        std::fs::write(dir.path().join("a.json"), "").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();

        let files = LocalTransport::new(dir.path()).list_files().unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["a.json", "b.csv"]);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let err = LocalTransport::new("/nonexistent/fileshipper")
            .list_files()
            .unwrap_err();
        assert!(err.is_io());
    }
}
