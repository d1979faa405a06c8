//! [`RenderSurface`] over a live chromiumoxide page

use crate::browser::{CaptureFormat, ElementCapture, PageHandle};
use crate::error::{CaptureError, Result};
use crate::surface::{text_content_script, RenderSurface};
use tracing::trace;

/// The opened viewer tab
#[derive(Clone)]
pub struct CdpSurface {
    page: PageHandle,
}

impl CdpSurface {
    /// Wrap an already navigated page
    pub fn new(page: PageHandle) -> Self {
        Self { page }
    }
}

impl RenderSurface for CdpSurface {
    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        ElementCapture::scroll_into_view(&self.page, selector).await
    }

    async fn snapshot_element(&self, selector: &str, format: CaptureFormat) -> Result<Vec<u8>> {
        ElementCapture::screenshot(&self.page, selector, format).await
    }

    async fn run_script(&self, script: &str) -> Result<()> {
        trace!(script, "Evaluating script");
        self.page
            .page
            .evaluate(script)
            .await
            .map_err(|e| CaptureError::ScriptFailed(e.to_string()))?;
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>> {
        let text = self
            .page
            .page
            .evaluate(text_content_script(selector))
            .await
            .map_err(|e| CaptureError::ScriptFailed(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| CaptureError::ScriptFailed(e.to_string()))?;
        Ok(Some(text).filter(|t| !t.is_empty()))
    }
}
