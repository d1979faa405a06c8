//! Error types for folio-capture
//!
//! Every concern gets its own `thiserror` enum; the top-level [`Error`]
//! wraps them so the pipeline can propagate with `?`. Capture retries are
//! driven by [`Error::is_transient`] rather than by catching everything.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for folio-capture operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Page capture errors
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Page count discovery errors
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Document assembly errors
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),

    /// A selector never appeared on the page
    #[error("Selector {selector} did not appear within {timeout_ms}ms")]
    SelectorTimeout {
        /// Selector that was awaited
        selector: String,
        /// How long we waited
        timeout_ms: u64,
    },
}

/// Per-page capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The element for a page could not be located
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Scrolling the element into view failed
    #[error("Scroll into view failed: {0}")]
    ScrollFailed(String),

    /// Screenshot failed
    #[error("Screenshot capture failed: {0}")]
    ScreenshotFailed(String),

    /// A surface-side script failed
    #[error("Script evaluation failed: {0}")]
    ScriptFailed(String),

    /// The artifact could not be written to the staging area
    #[error("Failed to write artifact {path}: {source}")]
    ArtifactWrite {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Page index outside 1..=page_count
    #[error("Invalid page index {0}")]
    InvalidPage(u32),

    /// All attempts for a page failed
    #[error("Page {page} failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        /// Page that could not be captured
        page: u32,
        /// Attempts made
        attempts: u32,
        /// Message of the final failure
        last_error: String,
    },
}

/// Page count discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Indicator element missing or empty
    #[error("Page count indicator {0} is missing or empty")]
    IndicatorMissing(String),

    /// Indicator text has no numeric suffix
    #[error("Page count indicator is not numeric: {0:?}")]
    NotNumeric(String),

    /// Indicator reported zero pages
    #[error("Page count indicator reported zero pages")]
    ZeroPages,
}

/// Document assembly errors
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// Nothing in the staging area
    #[error("No captured pages to assemble in {0}")]
    NoArtifacts(PathBuf),

    /// Artifact is not an image we can embed
    #[error("Unsupported image {path}: {reason}")]
    UnsupportedImage {
        /// Offending artifact
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Building or serialising the PDF failed
    #[error("PDF conversion failed: {0}")]
    Conversion(String),

    /// Conversion produced no bytes
    #[error("PDF conversion produced no output")]
    EmptyOutput,

    /// The assembly task panicked or was cancelled
    #[error("Assembly task did not complete: {0}")]
    Interrupted(String),

    /// Writing the output document failed
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Output path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The staging area could not be removed
    #[error("Failed to purge staging area {path}: {source}")]
    Cleanup {
        /// Staging directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Settings path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for our schema
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Settings path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A value failed validation
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid {
        /// Dotted field name
        field: &'static str,
        /// Why it is invalid
        reason: String,
    },
}

/// Result type alias for folio-capture operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Whether a capture attempt that hit this error may be retried.
    ///
    /// Rendering hiccups (element not yet laid out, CDP call failed,
    /// snapshot could not be written) are transient. Configuration,
    /// discovery and assembly problems are not, and neither is an
    /// already-exhausted retry budget.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Capture(e) => e.is_transient(),
            Error::Cdp(_) | Error::Io(_) | Error::Navigation(NavigationError::Timeout(_)) => true,
            Error::Navigation(NavigationError::SelectorTimeout { .. }) => true,
            _ => false,
        }
    }
}

impl CaptureError {
    /// Whether this failure may clear up on another attempt
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            CaptureError::InvalidPage(_) | CaptureError::RetriesExhausted { .. }
        )
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}
