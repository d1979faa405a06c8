//! Per-run staging directory for page artifacts

use crate::browser::CaptureFormat;
use crate::error::{CaptureError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Artifact file name prefix; the page number follows it
pub const ARTIFACT_PREFIX: &str = "page_";

/// Scoped directory owning every artifact of one run.
///
/// Each run gets its own `run-<uuid>` directory below the configured root, so
/// leftovers from an earlier preserved run never leak into this one.
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Create a fresh run directory under `root`
    pub async fn create(root: &Path) -> Result<Self> {
        let dir = root.join(format!("run-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Created staging area {}", dir.display());
        Ok(Self { dir })
    }

    /// Adopt an existing directory as a staging area
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the artifacts
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Deterministic artifact path for `page`
    pub fn artifact_path(&self, page: u32, format: CaptureFormat) -> PathBuf {
        self.dir.join(format!("{ARTIFACT_PREFIX}{page}.{}", format.extension()))
    }

    /// Persist a page snapshot, replacing any earlier attempt for the same page
    pub async fn write_artifact(
        &self,
        page: u32,
        format: CaptureFormat,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let path = self.artifact_path(page, format);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| CaptureError::ArtifactWrite {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Regular files currently in the staging area, unordered
    pub fn list(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    /// Delete the whole staging area. Missing directories are fine.
    pub fn purge(self) -> std::io::Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                info!("Purged staging area {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Leave the artifacts on disk and give back their location
    pub fn preserve(self) -> PathBuf {
        self.dir
    }
}
