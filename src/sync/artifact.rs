//! Per-survey export files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::rpc::ClientError;

/// What happened to an export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// New content was written
    Written(PathBuf),
    /// Existing file already had the same content
    Unchanged(PathBuf),
}

impl ArtifactStatus {
    pub fn path(&self) -> &Path {
        match self {
            ArtifactStatus::Written(path) | ArtifactStatus::Unchanged(path) => path,
        }
    }
}

/// Turns a survey title into a file stem.
///
/// `"T1 - Baseline"` becomes `"T1-Baseline"`; remaining spaces and path
/// separators become underscores.
pub fn file_stem(title: &str) -> String {
    title
        .replace(" - ", "-")
        .replace([' ', '/', '\\'], "_")
}

/// Export files stored under one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the export path for a survey title.
    pub fn path(&self, title: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", file_stem(title)))
    }

    /// Reads an existing export. Returns `Ok(None)` if it doesn't exist.
    pub fn read(&self, title: &str) -> Result<Option<String>, ClientError> {
        let path = self.path(title);
        match fs::read(&path) {
            // non-UTF-8 content can never equal a fresh export
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ClientError::Artifact { path, source }),
        }
    }

    /// Writes `content` unless the file already holds exactly these bytes.
    ///
    /// Creates the output directory if it doesn't exist.
    pub fn write_if_changed(
        &self,
        title: &str,
        content: &str,
    ) -> Result<ArtifactStatus, ClientError> {
        let path = self.path(title);

        if self.read(title)?.as_deref() == Some(content) {
            info!("skip unchanged file: {}", path.display());
            return Ok(ArtifactStatus::Unchanged(path));
        }

        fs::create_dir_all(&self.output_dir).map_err(|source| ClientError::Artifact {
            path: self.output_dir.clone(),
            source,
        })?;
        info!("write file: {}", path.display());
        fs::write(&path, content).map_err(|source| ClientError::Artifact {
            path: path.clone(),
            source,
        })?;

        Ok(ArtifactStatus::Written(path))
    }
}
