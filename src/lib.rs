//! folio-capture - Page-by-page capture of web e-book viewers
//!
//! This crate captures a paginated document rendered in a browser viewer one
//! page at a time and assembles the page images, in order, into a single PDF.
//!
//! # Architecture
//!
//! ```text
//! ViewerSession ──▶ RenderSurface (CDP)
//!                        │
//!                        ▼
//!          ┌───────────────────────────┐
//!          │ discover_page_count       │  once
//!          │ PageCaptureController     │  page 1..=N, retry + backoff
//!          └────────────┬──────────────┘
//!                       ▼
//!               StagingArea (page_N.png)
//!                       │
//!                       ▼
//!          SequenceAssembler ──▶ output.pdf, staging purged
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use folio_capture::{run_capture_pipeline, Settings, ViewerSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(None)?;
//!     let session = ViewerSession::open(&settings, "https://example.org/viewer/1").await?;
//!
//!     let result = run_capture_pipeline(
//!         session.surface(),
//!         &settings.pipeline_config(),
//!         &settings.delays(),
//!     )
//!     .await;
//!     session.close().await?;
//!
//!     println!("Wrote {}", result?.document.path.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod assembly;
pub mod browser;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod surface;
pub mod wait;

// Re-exports for convenience
pub use assembly::{AssembledDocument, SequenceAssembler};
pub use config::Settings;
pub use error::{Error, Result};
pub use pipeline::{run_capture_pipeline, CleanupPolicy, PipelineConfig, RunReport};
pub use session::ViewerSession;
pub use surface::RenderSurface;
pub use wait::{FixedDelays, NoDelay, WaitPolicy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
