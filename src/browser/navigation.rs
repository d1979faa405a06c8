//! Page navigation functionality
//!
//! URL navigation with retries and timeouts, plus waiting for viewer UI
//! elements to show up before the pipeline starts.

use crate::browser::PageHandle;
use crate::error::{Error, NavigationError, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Poll interval while waiting for a selector
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Options for page navigation
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Number of retry attempts (default: 3)
    pub retries: u32,
    /// Delay between retries in ms (default: 1000)
    pub retry_delay_ms: u64,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Resolves once the document has been parsed
const DOM_READY_SCRIPT: &str = r#"
    new Promise(resolve => {
        if (document.readyState !== 'loading') {
            resolve(true);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(true));
        }
    })
"#;

/// Result of a navigation operation
#[derive(Debug)]
pub struct NavigationResult {
    /// Final URL after any redirects
    pub final_url: String,
    /// Page title
    pub title: Option<String>,
}

/// Page navigator
pub struct PageNavigator;

impl PageNavigator {
    /// Navigate to a URL, retrying failed attempts
    #[instrument(skip(page, options))]
    pub async fn goto(
        page: &PageHandle,
        url: &str,
        options: Option<NavigationOptions>,
    ) -> Result<NavigationResult> {
        let opts = options.unwrap_or_default();

        url::Url::parse(url).map_err(|e| NavigationError::InvalidUrl(format!("{url}: {e}")))?;

        info!("Navigating to: {}", url);

        let mut last_error = None;
        for attempt in 0..=opts.retries {
            if attempt > 0 {
                warn!("Navigation retry attempt {} of {}", attempt, opts.retries);
                tokio::time::sleep(Duration::from_millis(opts.retry_delay_ms)).await;
            }

            match Self::navigate_once(&page.page, url, &opts).await {
                Ok((final_url, title)) => return Ok(NavigationResult { final_url, title }),
                Err(e) => {
                    warn!("Navigation attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            NavigationError::LoadFailed("Navigation failed after all retries".to_string()).into()
        }))
    }

    async fn navigate_once(
        page: &chromiumoxide::Page,
        url: &str,
        opts: &NavigationOptions,
    ) -> Result<(String, Option<String>)> {
        let timeout = Duration::from_millis(opts.timeout_ms);

        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| NavigationError::Timeout(opts.timeout_ms))?
            .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

        tokio::time::timeout(timeout, page.evaluate(DOM_READY_SCRIPT))
            .await
            .map_err(|_| NavigationError::Timeout(opts.timeout_ms))?
            .map_err(|e| Error::cdp(e.to_string()))?;

        let final_url = page
            .url()
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .unwrap_or_else(|| url.to_string());

        let title = page
            .evaluate("document.title")
            .await
            .ok()
            .and_then(|v| v.into_value::<String>().ok());

        debug!("Navigation complete: {} -> {}", url, final_url);
        Ok((final_url, title))
    }

    /// Poll until an element matching `selector` exists
    #[instrument(skip(page))]
    pub async fn wait_for_selector(
        page: &PageHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            if page.page.find_element(selector).await.is_ok() {
                debug!("Selector {} is present", selector);
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(NavigationError::SelectorTimeout {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }
                .into());
            }

            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    /// Scroll the window back to its origin
    #[instrument(skip(page))]
    pub async fn scroll_to_origin(page: &PageHandle) -> Result<()> {
        page.page
            .evaluate("window.scrollTo(0, 0);")
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;
        Ok(())
    }
}
