#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use csv_bind::{ReaderConfig, RowReader};
use tempfile::{TempDir, tempdir};

pub type TextReader = RowReader<Cursor<Vec<u8>>>;

/// Row reader over an in-memory string.
pub fn row_reader(input: &str, config: ReaderConfig) -> TextReader {
    RowReader::new(Cursor::new(input.as_bytes().to_vec()), config).expect("valid reader config")
}

pub fn cursor(input: &str) -> Cursor<Vec<u8>> {
    Cursor::new(input.as_bytes().to_vec())
}

/// Scratch directory for CLI tests; removed on drop.
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

    /// Writes `contents` under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}
