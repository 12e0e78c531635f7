use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::Interval;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse interval on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode interval: {0}")]
    Encode(#[source] serde_json::Error),
}

/// The interval log as seen by the dashboard.
///
/// Implementations keep intervals in insertion order and never expose a
/// partially written log to readers.
pub trait IntervalStore {
    /// Every stored interval in store order. A missing log is an empty log.
    fn read_all(&self) -> Result<Vec<Interval>, StorageError>;

    /// Adds one interval after the existing ones.
    fn append(&self, interval: &Interval) -> Result<(), StorageError>;

    /// Replaces the whole log with `intervals`.
    fn write_all(&self, intervals: &[Interval]) -> Result<(), StorageError>;
}

/// Index of the last interval (in store order) that has no end.
pub fn find_open(intervals: &[Interval]) -> Option<usize> {
    intervals.iter().rposition(Interval::is_open)
}

/// JSON-lines log: one interval object per line.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn ensure_parent(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }
        Ok(())
    }
}

impl IntervalStore for JsonlStore {
    fn read_all(&self) -> Result<Vec<Interval>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };

        let mut intervals = Vec::new();
        for (index, line) in raw.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let interval = serde_json::from_str(trimmed).map_err(|source| StorageError::Decode {
                line: index + 1,
                source,
            })?;
            intervals.push(interval);
        }

        Ok(intervals)
    }

    fn append(&self, interval: &Interval) -> Result<(), StorageError> {
        self.ensure_parent()?;
        let line = serde_json::to_string(interval).map_err(StorageError::Encode)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| self.io_error(err))?;
        file.write_all(line.as_bytes())
            .map_err(|err| self.io_error(err))?;
        file.write_all(b"\n").map_err(|err| self.io_error(err))?;
        Ok(())
    }

    fn write_all(&self, intervals: &[Interval]) -> Result<(), StorageError> {
        self.ensure_parent()?;

        let mut body = String::new();
        for interval in intervals {
            body.push_str(&serde_json::to_string(interval).map_err(StorageError::Encode)?);
            body.push('\n');
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, body).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;
        Ok(())
    }
}
