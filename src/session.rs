//! Viewer session
//!
//! Launches the browser, opens the document viewer and hands the pipeline a
//! ready [`CdpSurface`]. Signing in is not handled here: point
//! `browser.user_data_dir` at a profile that already has a session for the
//! viewer.

use crate::browser::{BrowserController, CdpSurface, NavigationOptions, PageNavigator};
use crate::config::Settings;
use crate::error::Result;
use tracing::{info, instrument};

/// An open browser showing the document viewer
pub struct ViewerSession {
    controller: BrowserController,
    surface: CdpSurface,
}

impl ViewerSession {
    /// Launch the browser and open the viewer at `url`.
    ///
    /// Returns once the page count indicator is present, the configured open
    /// delay has elapsed, and the window is scrolled back to the origin.
    #[instrument(skip(settings))]
    pub async fn open(settings: &Settings, url: &str) -> Result<Self> {
        let controller = BrowserController::launch(settings.browser.to_browser_config()).await?;

        match Self::prepare(&controller, settings, url).await {
            Ok(surface) => Ok(Self { controller, surface }),
            Err(e) => {
                let _ = controller.close().await;
                Err(e)
            }
        }
    }

    async fn prepare(
        controller: &BrowserController,
        settings: &Settings,
        url: &str,
    ) -> Result<CdpSurface> {
        let page = controller.new_page().await?;

        let options = NavigationOptions {
            timeout_ms: controller.config().timeout_ms,
            ..Default::default()
        };
        let nav = PageNavigator::goto(&page, url, Some(options)).await?;
        info!(
            "Opened viewer {} ({})",
            nav.final_url,
            nav.title.as_deref().unwrap_or("untitled")
        );

        PageNavigator::wait_for_selector(
            &page,
            &settings.viewer.page_count_selector,
            settings.viewer.ready_timeout,
        )
        .await?;

        tokio::time::sleep(settings.viewer.open_delay).await;
        PageNavigator::scroll_to_origin(&page).await?;

        Ok(CdpSurface::new(page))
    }

    /// The surface the pipeline captures from
    pub fn surface(&self) -> &CdpSurface {
        &self.surface
    }

    /// Close the browser
    pub async fn close(self) -> Result<()> {
        self.controller.close().await
    }
}
