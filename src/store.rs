//! JSON snapshot persistence.
//!
//! A snapshot is one JSON array of [`Post`] records. Reads treat a missing
//! file as an empty snapshot; writes truncate and rewrite the whole file.

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::Post;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid snapshot JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reads and writes snapshot files inside one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{community}_top_posts_{YYYY-MM-DD_HH-MM-SS}.json` inside the store directory.
    pub fn snapshot_path<Tz>(&self, community: &str, at: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.dir.join(format!(
            "{}_top_posts_{}.json",
            community,
            at.format("%Y-%m-%d_%H-%M-%S")
        ))
    }

    /// Loads a snapshot. A missing file is an empty snapshot.
    ///
    /// # Errors
    ///
    /// Any other I/O failure, or content that is not a JSON array of posts.
    pub fn read(&self, path: &Path) -> Result<Vec<Post>, StoreError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overwrites `path` with `posts` as an indented UTF-8 JSON array.
    ///
    /// Not atomic: a crash mid-write leaves a truncated file.
    pub fn write(&self, path: &Path, posts: &[Post]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        posts
            .serialize(&mut serializer)
            .map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        writer.flush().map_err(io_err)
    }
}
