//! Per-page capture with retry
//!
//! Each attempt scrolls the page element into view, lets it settle, snapshots
//! it into the staging area and hides the notifications overlay. A failed
//! attempt nudges the horizontal scroll offset to shake loose a stuck layout
//! and backs off before trying again.

use crate::browser::CaptureFormat;
use crate::config::PAGE_PLACEHOLDER;
use crate::error::{CaptureError, Error, Result};
use crate::pipeline::staging::StagingArea;
use crate::surface::{hide_element_script, scroll_by_script, RenderSurface};
use crate::wait::WaitPolicy;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

/// One page image in the staging area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    /// 1-based page index
    pub page: u32,
    /// Location in the staging area
    pub path: PathBuf,
    /// Size in bytes
    pub size: usize,
}

/// How a single attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Artifact written and overlay suppressed
    Success,
    /// Retryable failure
    TransientFailure {
        /// Failure message
        error: String,
    },
}

/// Record of one try at one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureAttempt {
    /// 1-based page index
    pub page: u32,
    /// 0-based attempt number
    pub attempt: u32,
    /// Outcome
    pub outcome: AttemptStatus,
}

/// Classified result of a single attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The page was captured
    Success(CaptureArtifact),
    /// The attempt failed but another may succeed
    TransientFailure(Error),
    /// The page cannot be captured; do not retry
    TerminalFailure(Error),
}

impl From<Result<CaptureArtifact>> for AttemptOutcome {
    fn from(result: Result<CaptureArtifact>) -> Self {
        match result {
            Ok(artifact) => AttemptOutcome::Success(artifact),
            Err(e) if e.is_transient() => AttemptOutcome::TransientFailure(e),
            Err(e) => AttemptOutcome::TerminalFailure(e),
        }
    }
}

/// A successfully captured page and the attempts it took
#[derive(Debug, Clone)]
pub struct CapturedPage {
    /// The stored image
    pub artifact: CaptureArtifact,
    /// Every attempt, failed ones first
    pub attempts: Vec<CaptureAttempt>,
}

/// Selectors and tuning for the capture loop
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// Page element selector with a `{n}` placeholder
    pub page_selector: String,
    /// Overlay hidden after each successful capture
    pub overlay_selector: String,
    /// Horizontal scroll applied after a failed attempt
    pub scroll_nudge_px: i64,
    /// Snapshot image format
    pub format: CaptureFormat,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            page_selector: "#page_{n}".to_string(),
            overlay_selector: "#viewer__wrapper__notifications-new-bottom".to_string(),
            scroll_nudge_px: 4000,
            format: CaptureFormat::Png,
        }
    }
}

impl CaptureOptions {
    /// Selector of the element for `page`
    pub fn selector_for(&self, page: u32) -> String {
        self.page_selector.replace(PAGE_PLACEHOLDER, &page.to_string())
    }
}

/// Drives the capture of individual pages on one surface
pub struct PageCaptureController<'a, S, W> {
    surface: &'a S,
    waits: &'a W,
    staging: &'a StagingArea,
    options: CaptureOptions,
}

impl<'a, S: RenderSurface, W: WaitPolicy> PageCaptureController<'a, S, W> {
    /// Create a controller writing into `staging`
    pub fn new(
        surface: &'a S,
        waits: &'a W,
        staging: &'a StagingArea,
        options: CaptureOptions,
    ) -> Self {
        Self {
            surface,
            waits,
            staging,
            options,
        }
    }

    /// Capture `page`, making at most `max_retries` attempts.
    ///
    /// Returns as soon as an attempt succeeds or a non-retryable error
    /// occurs. When every attempt fails transiently the error is
    /// [`CaptureError::RetriesExhausted`].
    #[instrument(skip(self), fields(selector = %self.options.selector_for(page)))]
    pub async fn capture(&self, page: u32, max_retries: u32) -> Result<CapturedPage> {
        if page == 0 {
            return Err(CaptureError::InvalidPage(page).into());
        }

        let mut attempts = Vec::new();
        let mut last_error = String::from("no attempt made");

        for attempt in 0..max_retries {
            match AttemptOutcome::from(self.attempt_once(page).await) {
                AttemptOutcome::Success(artifact) => {
                    info!("Page {} captured ({} bytes)", page, artifact.size);
                    attempts.push(CaptureAttempt {
                        page,
                        attempt,
                        outcome: AttemptStatus::Success,
                    });
                    return Ok(CapturedPage { artifact, attempts });
                }
                AttemptOutcome::TerminalFailure(e) => {
                    error!(
                        "Page {} failed terminally on attempt {}: {}",
                        page,
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }
                AttemptOutcome::TransientFailure(e) => {
                    warn!("Attempt {} failed for page {}: {}", attempt + 1, page, e);
                    last_error = e.to_string();
                    attempts.push(CaptureAttempt {
                        page,
                        attempt,
                        outcome: AttemptStatus::TransientFailure {
                            error: last_error.clone(),
                        },
                    });

                    if attempt + 1 < max_retries {
                        self.nudge().await;
                        self.waits.backoff(attempt).await;
                    }
                }
            }
        }

        error!(
            "Could not capture page {} after {} attempt(s)",
            page, max_retries
        );
        Err(CaptureError::RetriesExhausted {
            page,
            attempts: attempts.len() as u32,
            last_error,
        }
        .into())
    }

    async fn attempt_once(&self, page: u32) -> Result<CaptureArtifact> {
        let selector = self.options.selector_for(page);

        self.surface.scroll_into_view(&selector).await?;
        self.waits.settle().await;

        let bytes = self
            .surface
            .snapshot_element(&selector, self.options.format)
            .await?;
        if bytes.is_empty() {
            return Err(CaptureError::ScreenshotFailed(format!("{selector}: empty image")).into());
        }

        let path = self
            .staging
            .write_artifact(page, self.options.format, &bytes)
            .await?;

        self.surface
            .run_script(&hide_element_script(&self.options.overlay_selector))
            .await?;

        Ok(CaptureArtifact {
            page,
            path,
            size: bytes.len(),
        })
    }

    async fn nudge(&self) {
        let script = scroll_by_script(self.options.scroll_nudge_px);
        if let Err(e) = self.surface.run_script(&script).await {
            debug!("Scroll nudge failed: {}", e);
        }
    }
}
