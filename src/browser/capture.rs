//! Element capture
//!
//! Snapshot formats and the CDP element screenshot used for page artifacts.

use crate::browser::PageHandle;
use crate::error::{CaptureError, Result};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Image format for page snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// PNG screenshot
    #[default]
    Png,
    /// JPEG screenshot
    Jpeg,
}

impl CaptureFormat {
    /// Get file extension
    pub fn extension(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Jpeg => "jpg",
        }
    }

    fn to_cdp(self) -> CaptureScreenshotFormat {
        match self {
            CaptureFormat::Png => CaptureScreenshotFormat::Png,
            CaptureFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        }
    }
}

/// Element-level captures
pub struct ElementCapture;

impl ElementCapture {
    /// Scroll the element matching `selector` into view
    #[instrument(skip(page))]
    pub async fn scroll_into_view(page: &PageHandle, selector: &str) -> Result<()> {
        let element = page
            .page
            .find_element(selector)
            .await
            .map_err(|e| CaptureError::ElementNotFound(format!("{selector}: {e}")))?;

        element
            .scroll_into_view()
            .await
            .map_err(|e| CaptureError::ScrollFailed(format!("{selector}: {e}")))?;

        Ok(())
    }

    /// Capture a specific element
    #[instrument(skip(page))]
    pub async fn screenshot(
        page: &PageHandle,
        selector: &str,
        format: CaptureFormat,
    ) -> Result<Vec<u8>> {
        let element = page
            .page
            .find_element(selector)
            .await
            .map_err(|e| CaptureError::ElementNotFound(format!("{selector}: {e}")))?;

        let data = element
            .screenshot(format.to_cdp())
            .await
            .map_err(|e| CaptureError::ScreenshotFailed(e.to_string()))?;

        if data.is_empty() {
            return Err(CaptureError::ScreenshotFailed(format!("{selector}: empty image")).into());
        }

        debug!("Element screenshot captured: {} bytes", data.len());
        Ok(data)
    }
}
