//! Persistence of finished artifacts

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Where a saved artifact ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation(pub String);

impl ArtifactLocation {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PathBuf> for ArtifactLocation {
    fn from(path: PathBuf) -> Self {
        Self(path.display().to_string())
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Artifact store unavailable: {0}")]
    Unavailable(String),
}

/// Saves rendered artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save(&self, content: &str) -> Result<ArtifactLocation, PersistenceError>;
}

/// Writes `linkedin_post_YYYYmmdd_HHMMSS.txt` files into a directory
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for an artifact saved now, in local time
    pub fn file_name() -> String {
        format!("linkedin_post_{}.txt", Local::now().format("%Y%m%d_%H%M%S"))
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn save(&self, content: &str) -> Result<ArtifactLocation, PersistenceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| PersistenceError::CreateDir {
                path: self.dir.display().to_string(),
                source,
            })?;

        let path = self.dir.join(Self::file_name());
        debug!(path = %path.display(), bytes = content.len(), "Writing artifact");

        tokio::fs::write(&path, content)
            .await
            .map_err(|source| PersistenceError::Write {
                path: path.display().to_string(),
                source,
            })?;

        info!(path = %path.display(), "Artifact saved");
        Ok(ArtifactLocation::from(path))
    }
}
