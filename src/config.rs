//! Run configuration
//!
//! Settings are read once from `settings.toml` (or defaults), overridden by
//! CLI flags in `main`, validated, and then handed to the session and the
//! pipeline by reference. Nothing downstream re-reads or mutates them.
//!
//! ```toml
//! [browser]
//! headless = true
//! scale = 1.5
//! user_data_dir = "profile"
//!
//! [viewer]
//! url = "https://example.org/viewer/545336"
//! open_delay = "10s"
//!
//! [capture]
//! max_retries = 3
//! backoff_delay = "1s"
//!
//! [output]
//! path = "output.pdf"
//! cleanup_on_abort = "preserve"
//! ```

use crate::browser::{BrowserConfig, CaptureFormat};
use crate::error::ConfigError;
use crate::pipeline::{CleanupPolicy, PipelineConfig};
use crate::wait::FixedDelays;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Settings file looked up in the working directory when none is given
pub const DEFAULT_SETTINGS_FILE: &str = "settings.toml";

/// Placeholder substituted with the page number in `viewer.page_selector`
pub const PAGE_PLACEHOLDER: &str = "{n}";

/// Base viewport edge in CSS pixels, multiplied by `browser.scale`
const BASE_VIEWPORT: f64 = 2000.0;

/// All settings for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Browser launch settings
    pub browser: BrowserSettings,
    /// Where the viewer lives and how its UI is laid out
    pub viewer: ViewerSettings,
    /// Capture loop tuning
    pub capture: CaptureSettings,
    /// Output and staging locations
    pub output: OutputSettings,
    /// Older `[scraper]` section, folded into the above on load
    #[serde(skip_serializing)]
    scraper: Option<LegacyScraperSettings>,
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a visible window
    pub headless: bool,
    /// Device scale factor; the viewport is `2000 * scale` square
    pub scale: f64,
    /// Chrome sandbox
    pub sandbox: bool,
    /// Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<PathBuf>,
    /// Persistent profile directory carrying an authenticated session
    pub user_data_dir: Option<PathBuf>,
    /// Navigation timeout
    #[serde(with = "humantime_serde")]
    pub nav_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            scale: 1.0,
            sandbox: true,
            chrome_path: None,
            user_data_dir: None,
            nav_timeout: Duration::from_secs(30),
        }
    }
}

impl BrowserSettings {
    /// Translate into a launch configuration for the browser controller
    pub fn to_browser_config(&self) -> BrowserConfig {
        let edge = (BASE_VIEWPORT * self.scale).round() as u32;
        let mut builder = BrowserConfig::builder()
            .headless(self.headless)
            .viewport(edge, edge)
            .device_scale_factor(self.scale)
            .sandbox(self.sandbox)
            .timeout_ms(self.nav_timeout.as_millis() as u64);

        if let Some(ref path) = self.chrome_path {
            builder = builder.chrome_path(path.clone());
        }
        if let Some(ref dir) = self.user_data_dir {
            builder = builder.user_data_dir(dir.clone());
        }

        builder.build()
    }
}

/// Viewer location and UI selectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// URL of the opened document viewer
    pub url: Option<String>,
    /// Selector of a page element; `{n}` is replaced by the page number
    pub page_selector: String,
    /// Floating notifications element hidden after each capture
    pub overlay_selector: String,
    /// Element whose text holds the total page count
    pub page_count_selector: String,
    /// Characters preceding the number in the page count text
    pub page_count_prefix_chars: usize,
    /// Pause after the viewer is ready, before discovery
    #[serde(with = "humantime_serde")]
    pub open_delay: Duration,
    /// How long to wait for the page count indicator to appear
    #[serde(with = "humantime_serde")]
    pub ready_timeout: Duration,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            url: None,
            page_selector: "#page_{n}".to_string(),
            overlay_selector: "#viewer__wrapper__notifications-new-bottom".to_string(),
            page_count_selector: "#viewer__bar__pages-scale > span:nth-of-type(2)".to_string(),
            page_count_prefix_chars: 2,
            open_delay: Duration::from_secs(10),
            ready_timeout: Duration::from_secs(30),
        }
    }
}

/// Capture loop tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Attempts per page before the run aborts
    pub max_retries: u32,
    /// Pause after scrolling a page into view
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Pause after a failed attempt
    #[serde(with = "humantime_serde")]
    pub backoff_delay: Duration,
    /// Pause between pages
    #[serde(with = "humantime_serde")]
    pub cooldown: Duration,
    /// Horizontal scroll applied after a failed attempt
    pub scroll_nudge_px: i64,
    /// Image format of page snapshots
    pub format: CaptureFormat,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            settle_delay: Duration::from_millis(100),
            backoff_delay: Duration::from_secs(1),
            cooldown: Duration::from_millis(100),
            scroll_nudge_px: 4000,
            format: CaptureFormat::Png,
        }
    }
}

/// Output and staging locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Final PDF
    pub path: PathBuf,
    /// Root under which each run creates its staging directory
    pub staging_dir: PathBuf,
    /// What happens to captured pages when the run aborts
    pub cleanup_on_abort: CleanupPolicy,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output.pdf"),
            staging_dir: PathBuf::from("temp/images"),
            cleanup_on_abort: CleanupPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LegacyScraperSettings {
    scale: Option<f64>,
    /// Seconds, fractional
    cooldown_between_pages: Option<f64>,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist. Without one, `./settings.toml` is used if
    /// present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !default.is_file() {
                    info!("No {} found, using defaults", DEFAULT_SETTINGS_FILE);
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let settings = Self::from_toml_str(&raw, &path)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse settings from TOML text. `origin` is only used in errors.
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let parse_err = |e: toml::de::Error| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        };
        let table: toml::Table = raw.parse().map_err(parse_err)?;
        let mut settings: Settings = toml::Value::Table(table.clone())
            .try_into()
            .map_err(parse_err)?;
        settings.fold_legacy(&table);
        Ok(settings)
    }

    /// Apply `[scraper]` values whose current key is not set in `table`
    fn fold_legacy(&mut self, table: &toml::Table) {
        let Some(legacy) = self.scraper.take() else {
            return;
        };

        if let Some(scale) = legacy.scale {
            if !has_key(table, "browser", "scale") {
                self.browser.scale = scale;
            }
        }
        if let Some(secs) = legacy.cooldown_between_pages {
            if secs.is_finite() && secs >= 0.0 && !has_key(table, "capture", "cooldown") {
                self.capture.cooldown = Duration::from_secs_f64(secs);
            }
        }
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "capture.max_retries",
                reason: "must be at least 1".to_string(),
            });
        }

        if !self.browser.scale.is_finite() || self.browser.scale <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "browser.scale",
                reason: format!("must be a positive number, got {}", self.browser.scale),
            });
        }

        if !self.viewer.page_selector.contains(PAGE_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                field: "viewer.page_selector",
                reason: format!("must contain the {PAGE_PLACEHOLDER} placeholder"),
            });
        }

        for (field, value) in [
            ("viewer.overlay_selector", &self.viewer.overlay_selector),
            ("viewer.page_count_selector", &self.viewer.page_count_selector),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }

        if let Some(ref raw) = self.viewer.url {
            validate_url(raw)?;
        }

        Ok(())
    }

    /// The viewer URL, which must be set by the file or the CLI
    pub fn viewer_url(&self) -> Result<&str, ConfigError> {
        self.viewer.url.as_deref().ok_or_else(|| ConfigError::Invalid {
            field: "viewer.url",
            reason: "no viewer URL configured".to_string(),
        })
    }

    /// Pauses used by the capture loop
    pub fn delays(&self) -> FixedDelays {
        FixedDelays {
            settle: self.capture.settle_delay,
            backoff: self.capture.backoff_delay,
            cooldown: self.capture.cooldown,
        }
    }

    /// Pipeline parameters derived from these settings
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            page_selector: self.viewer.page_selector.clone(),
            overlay_selector: self.viewer.overlay_selector.clone(),
            page_count_selector: self.viewer.page_count_selector.clone(),
            page_count_prefix_chars: self.viewer.page_count_prefix_chars,
            max_retries: self.capture.max_retries,
            scroll_nudge_px: self.capture.scroll_nudge_px,
            format: self.capture.format,
            staging_root: self.output.staging_dir.clone(),
            output_path: self.output.path.clone(),
            cleanup_on_abort: self.output.cleanup_on_abort,
        }
    }
}

fn has_key(table: &toml::Table, section: &str, key: &str) -> bool {
    table
        .get(section)
        .and_then(toml::Value::as_table)
        .is_some_and(|s| s.contains_key(key))
}

fn validate_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::Invalid {
        field: "viewer.url",
        reason: format!("{raw}: {e}"),
    })?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(()),
        other => Err(ConfigError::Invalid {
            field: "viewer.url",
            reason: format!("unsupported scheme {other}"),
        }),
    }
}
