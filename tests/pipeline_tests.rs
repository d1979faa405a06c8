//! End-to-end pipeline tests against a scripted surface

mod common;

use common::{entry_count, pdf_page_widths, Event, ScriptedSurface};
use folio_capture::error::{CaptureError, DiscoveryError, Error};
use folio_capture::{run_capture_pipeline, CleanupPolicy, NoDelay, PipelineConfig, Settings};
use pretty_assertions::assert_eq;
use std::path::Path;

fn config(root: &Path, cleanup: CleanupPolicy) -> PipelineConfig {
    let mut settings = Settings::default();
    settings.output.staging_dir = root.join("staging");
    settings.output.path = root.join("output.pdf");
    settings.output.cleanup_on_abort = cleanup;
    settings.pipeline_config()
}

#[tokio::test]
async fn test_full_run() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), CleanupPolicy::Purge);
    let surface = ScriptedSurface::with_pages(11).failing(3, 1);

    let report = run_capture_pipeline(&surface, &config, &NoDelay)
        .await
        .unwrap();

    assert_eq!(report.page_count, 11);
    assert_eq!(report.document.page_count, 11);
    assert_eq!(report.pages.len(), 11);
    assert_eq!(
        report.retried_pages().map(|p| p.page).collect::<Vec<_>>(),
        vec![3]
    );
    assert_eq!(
        pdf_page_widths(&config.output_path),
        (1..=11).map(|p| 10 + p).collect::<Vec<i64>>()
    );
    assert_eq!(entry_count(&config.staging_root), 0);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["page_count"], 11);
    assert_eq!(json["pages"][2]["attempts"].as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_run_on_multi_thread_runtime() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), CleanupPolicy::Purge);
    let surface = ScriptedSurface::with_pages(3);

    let report = run_capture_pipeline(&surface, &config, &NoDelay)
        .await
        .unwrap();

    assert_eq!(report.document.path, config.output_path);
    assert_eq!(pdf_page_widths(&config.output_path), vec![11, 12, 13]);
    assert_eq!(entry_count(&config.staging_root), 0);
}

#[tokio::test]
async fn test_pages_captured_strictly_in_sequence() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), CleanupPolicy::Purge);
    let surface = ScriptedSurface::with_pages(5).failing(2, 2).failing(4, 1);

    run_capture_pipeline(&surface, &config, &NoDelay)
        .await
        .unwrap();

    let events = surface.events();
    assert_eq!(events[0], Event::ReadText);

    // Every attempt at page i+1 starts after page i was snapshotted and the
    // overlay hidden.
    let mut current = 0;
    let mut finished = 0;
    for event in &events[1..] {
        match *event {
            Event::Scroll(page) => {
                assert!(page == current || page == finished + 1, "{events:?}");
                assert!(page >= current, "{events:?}");
                current = page;
            }
            Event::Snapshot(page) => assert_eq!(page, current),
            Event::HideOverlay => finished = current,
            Event::Nudge | Event::ReadText => {}
        }
    }
    assert_eq!(finished, 5);
}

#[tokio::test]
async fn test_terminal_page_failure_purges_by_default() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), CleanupPolicy::Purge);
    let surface = ScriptedSurface::with_pages(6).always_failing(4);

    let err = run_capture_pipeline(&surface, &config, &NoDelay)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Capture(CaptureError::RetriesExhausted {
            page: 4,
            attempts: 3,
            ..
        })
    ));
    assert_eq!(surface.attempts(4), 3);
    assert_eq!(surface.attempts(5), 0);
    assert!(!config.output_path.exists());
    assert_eq!(entry_count(&config.staging_root), 0);
}

#[tokio::test]
async fn test_terminal_page_failure_can_preserve_captures() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), CleanupPolicy::Preserve);
    let surface = ScriptedSurface::with_pages(6).always_failing(4);

    assert!(run_capture_pipeline(&surface, &config, &NoDelay)
        .await
        .is_err());
    assert!(!config.output_path.exists());

    let runs: Vec<_> = std::fs::read_dir(&config.staging_root)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(runs.len(), 1);

    let mut kept: Vec<_> = std::fs::read_dir(&runs[0])
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    kept.sort();
    assert_eq!(kept, vec!["page_1.png", "page_2.png", "page_3.png"]);
}

#[tokio::test]
async fn test_discovery_failure_aborts_before_capture() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), CleanupPolicy::Purge);
    let surface = ScriptedSurface::without_indicator();

    let err = run_capture_pipeline(&surface, &config, &NoDelay)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Discovery(DiscoveryError::IndicatorMissing(_))
    ));
    assert_eq!(surface.events(), vec![Event::ReadText]);
    assert!(!config.staging_root.exists());
    assert!(!config.output_path.exists());
}
