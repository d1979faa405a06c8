//! folio: capture a web e-book viewer into a PDF

use anyhow::Context;
use clap::Parser;
use folio_capture::{run_capture_pipeline, CleanupPolicy, RunReport, Settings, ViewerSession};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Capture a paginated web document viewer page by page into a single PDF
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Capture a web e-book viewer page by page into a PDF")]
struct Args {
    /// URL of the opened document viewer (overrides viewer.url)
    #[arg(short, long)]
    url: Option<String>,

    /// Settings file (default: ./settings.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output PDF path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Root directory for intermediate page images
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Attempts per page before giving up
    #[arg(long)]
    max_retries: Option<u32>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Chrome profile directory with an authenticated viewer session
    #[arg(long)]
    user_data_dir: Option<PathBuf>,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<PathBuf>,

    /// Keep captured pages on disk if the run aborts
    #[arg(long)]
    keep_partial: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    report_json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(ref url) = self.url {
            settings.viewer.url = Some(url.clone());
        }
        if let Some(ref output) = self.output {
            settings.output.path = output.clone();
        }
        if let Some(ref dir) = self.staging_dir {
            settings.output.staging_dir = dir.clone();
        }
        if let Some(retries) = self.max_retries {
            settings.capture.max_retries = retries;
        }
        if self.headful {
            settings.browser.headless = false;
        }
        if let Some(ref dir) = self.user_data_dir {
            settings.browser.user_data_dir = Some(dir.clone());
        }
        if let Some(ref path) = self.chrome_path {
            settings.browser.chrome_path = Some(path.clone());
        }
        if self.keep_partial {
            settings.output.cleanup_on_abort = CleanupPolicy::Preserve;
        }
    }
}

fn init_tracing(args: &Args) {
    let default = if args.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(args: &Args) -> anyhow::Result<RunReport> {
    let mut settings =
        Settings::load(args.config.as_deref()).context("failed to load settings")?;
    args.apply(&mut settings);
    settings.validate().context("invalid settings")?;
    let url = settings.viewer_url()?.to_string();

    let session = ViewerSession::open(&settings, &url)
        .await
        .context("failed to open the document viewer")?;

    let result = run_capture_pipeline(
        session.surface(),
        &settings.pipeline_config(),
        &settings.delays(),
    )
    .await;

    if let Err(e) = session.close().await {
        error!("Failed to close browser: {}", e);
    }

    Ok(result?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    info!("{} {} starting", folio_capture::NAME, folio_capture::VERSION);

    match run(&args).await {
        Ok(report) => {
            info!(
                "Saved {} pages to {}",
                report.document.page_count,
                report.document.path.display()
            );
            if args.report_json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => error!("Failed to serialise run report: {}", e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
