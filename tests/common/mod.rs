#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use bom_reconcile::{Mapping, Mappings, Table};
use tempfile::{TempDir, tempdir};

/// Builds a table from string literals; the first slice is the header row.
pub fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table::from_records(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
}

/// Mapping over the `code`/`qty`/`desc`/`rev`/`cat` column names used by
/// the fixtures in this directory.
pub fn full_mapping() -> Mapping {
    Mapping::new("code", "qty")
        .with_description("desc")
        .with_revision("rev")
        .with_category("cat")
}

pub fn same_mappings(mapping: Mapping) -> Mappings {
    Mappings::new(mapping.clone(), mapping)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
