//! Sequence assembly
//!
//! Turns the staging area into the final document: artifacts are ordered by
//! the page number in their file name, converted into a PDF with one page per
//! image, and the staging area is purged no matter how assembly ends.

pub mod order;
pub mod pdf;

pub use order::{natural_cmp, sort_naturally};
pub use pdf::ImagePdf;

use crate::error::{AssemblyError, Result};
use crate::pipeline::StagingArea;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// The assembled output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledDocument {
    /// Where the PDF was written
    pub path: PathBuf,
    /// Pages in the PDF
    pub page_count: usize,
    /// File size in bytes
    pub size: usize,
}

/// Collects staged artifacts into one PDF
pub struct SequenceAssembler;

impl SequenceAssembler {
    /// Assemble every artifact in `staging` into `output`, then purge `staging`.
    ///
    /// `output` is only created once the whole document has been built, via a
    /// sibling `.partial` file renamed into place.
    #[instrument(skip(staging), fields(dir = %staging.path().display()))]
    pub fn assemble(staging: StagingArea, output: &Path) -> Result<AssembledDocument> {
        let assembled = Self::build(&staging, output);
        let staging_path = staging.path().to_path_buf();
        let purged = staging.purge();

        match (assembled, purged) {
            (Ok(doc), Ok(())) => Ok(doc),
            (Ok(_), Err(source)) => Err(AssemblyError::Cleanup {
                path: staging_path,
                source,
            }
            .into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(purge_err)) => {
                warn!(
                    "Failed to purge staging area {}: {}",
                    staging_path.display(),
                    purge_err
                );
                Err(e)
            }
        }
    }

    /// Artifacts in page order
    pub fn ordered_artifacts(staging: &StagingArea) -> Result<Vec<PathBuf>> {
        let mut files = staging.list()?;
        sort_naturally(&mut files);
        Ok(files)
    }

    fn build(staging: &StagingArea, output: &Path) -> Result<AssembledDocument> {
        let files = Self::ordered_artifacts(staging)?;
        if files.is_empty() {
            return Err(AssemblyError::NoArtifacts(staging.path().to_path_buf()).into());
        }
        debug!("Assembling {} artifacts", files.len());

        let mut pdf = ImagePdf::new();
        for file in &files {
            pdf.add_image_file(file)?;
        }
        let page_count = pdf.page_count();

        let bytes = pdf.finish()?;
        if bytes.is_empty() {
            return Err(AssemblyError::EmptyOutput.into());
        }

        write_atomically(output, &bytes)?;
        info!(
            "Wrote {} pages ({} bytes) to {}",
            page_count,
            bytes.len(),
            output.display()
        );

        Ok(AssembledDocument {
            path: output.to_path_buf(),
            page_count,
            size: bytes.len(),
        })
    }
}

fn write_atomically(output: &Path, bytes: &[u8]) -> std::result::Result<(), AssemblyError> {
    let write_err = |source: std::io::Error| AssemblyError::Write {
        path: output.to_path_buf(),
        source,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut partial = output.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    std::fs::write(&partial, bytes).map_err(write_err)?;
    if let Err(source) = std::fs::rename(&partial, output) {
        let _ = std::fs::remove_file(&partial);
        return Err(write_err(source));
    }
    Ok(())
}
