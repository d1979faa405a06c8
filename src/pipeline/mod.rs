//! Capture-and-assemble pipeline
//!
//! ```text
//! discover page count ──▶ create staging ──▶ capture 1..=N ──▶ assemble + purge
//!                                                  │
//!                                                  └─ terminal failure ──▶ cleanup policy
//! ```
//!
//! Everything runs on one task, one step at a time. The surface is shared
//! mutable state (scroll offset, hidden overlay) and pages are captured in
//! strictly increasing order. Assembly is handed to the blocking pool only
//! after the last page is captured.

pub mod capture;
pub mod discovery;
pub mod staging;

pub use capture::{
    AttemptOutcome, AttemptStatus, CaptureArtifact, CaptureAttempt, CaptureOptions, CapturedPage,
    PageCaptureController,
};
pub use discovery::{discover_page_count, parse_page_count};
pub use staging::StagingArea;

use crate::assembly::{AssembledDocument, SequenceAssembler};
use crate::browser::CaptureFormat;
use crate::error::{AssemblyError, Result};
use crate::surface::RenderSurface;
use crate::wait::WaitPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// What to do with captured pages when a run aborts before assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Delete the staging area
    #[default]
    Purge,
    /// Keep already captured pages on disk for manual recovery
    Preserve,
}

/// Parameters of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Page element selector with a `{n}` placeholder
    pub page_selector: String,
    /// Overlay hidden after every capture
    pub overlay_selector: String,
    /// Page count indicator
    pub page_count_selector: String,
    /// Label characters before the page count
    pub page_count_prefix_chars: usize,
    /// Attempts per page
    pub max_retries: u32,
    /// Horizontal scroll nudge after a failed attempt
    pub scroll_nudge_px: i64,
    /// Snapshot format
    pub format: CaptureFormat,
    /// Root of the per-run staging directories
    pub staging_root: PathBuf,
    /// Final document
    pub output_path: PathBuf,
    /// Behaviour on early abort
    pub cleanup_on_abort: CleanupPolicy,
}

impl PipelineConfig {
    fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            page_selector: self.page_selector.clone(),
            overlay_selector: self.overlay_selector.clone(),
            scroll_nudge_px: self.scroll_nudge_px,
            format: self.format,
        }
    }
}

/// Per-page summary in the run report
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// 1-based page index
    pub page: u32,
    /// Artifact size in bytes
    pub size: usize,
    /// Attempts, including the successful one
    pub attempts: Vec<CaptureAttempt>,
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// The assembled PDF
    pub document: AssembledDocument,
    /// Pages reported by the viewer
    pub page_count: u32,
    /// Per-page capture details
    pub pages: Vec<PageReport>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// Pages that needed more than one attempt
    pub fn retried_pages(&self) -> impl Iterator<Item = &PageReport> {
        self.pages.iter().filter(|p| p.attempts.len() > 1)
    }
}

/// Run discovery, capture every page, and assemble the document.
///
/// The caller owns the surface and tears it down afterwards, whatever the
/// outcome.
#[instrument(skip_all, fields(output = %config.output_path.display()))]
pub async fn run_capture_pipeline<S, W>(
    surface: &S,
    config: &PipelineConfig,
    waits: &W,
) -> Result<RunReport>
where
    S: RenderSurface,
    W: WaitPolicy,
{
    let started_at = Utc::now();
    let start = Instant::now();

    let page_count = discover_page_count(
        surface,
        &config.page_count_selector,
        config.page_count_prefix_chars,
    )
    .await?;

    let staging = StagingArea::create(&config.staging_root).await?;
    let pages = match capture_all(surface, config, waits, &staging, page_count).await {
        Ok(pages) => pages,
        Err(e) => {
            abort_cleanup(staging, config.cleanup_on_abort);
            return Err(e);
        }
    };

    // PDF encoding and file I/O are synchronous
    let output = config.output_path.clone();
    let document =
        tokio::task::spawn_blocking(move || SequenceAssembler::assemble(staging, &output))
            .await
            .map_err(|e| AssemblyError::Interrupted(e.to_string()))??;

    let report = RunReport {
        document,
        page_count,
        pages,
        started_at,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Run complete: {} pages in {} ms ({} retried)",
        report.page_count,
        report.duration_ms,
        report.retried_pages().count()
    );
    Ok(report)
}

async fn capture_all<S: RenderSurface, W: WaitPolicy>(
    surface: &S,
    config: &PipelineConfig,
    waits: &W,
    staging: &StagingArea,
    page_count: u32,
) -> Result<Vec<PageReport>> {
    let controller = PageCaptureController::new(surface, waits, staging, config.capture_options());
    let mut pages = Vec::with_capacity(page_count as usize);

    for page in 1..=page_count {
        if page > 1 {
            waits.between_pages().await;
        }

        let captured = controller.capture(page, config.max_retries).await.map_err(|e| {
            error!("Aborting run at page {} of {}", page, page_count);
            e
        })?;

        pages.push(PageReport {
            page,
            size: captured.artifact.size,
            attempts: captured.attempts,
        });
    }

    Ok(pages)
}

fn abort_cleanup(staging: StagingArea, policy: CleanupPolicy) {
    match policy {
        CleanupPolicy::Purge => {
            if let Err(e) = staging.purge() {
                warn!("Failed to purge staging area after abort: {}", e);
            }
        }
        CleanupPolicy::Preserve => {
            let dir = staging.preserve();
            warn!("Captured pages kept in {}", dir.display());
        }
    }
}
