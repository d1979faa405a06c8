//! Page capture controller tests
//!
//! Drive the retry state machine against a scripted surface.

mod common;

use common::{Event, Fault, ScriptedSurface};
use folio_capture::error::{CaptureError, Error};
use folio_capture::pipeline::{AttemptStatus, CaptureOptions, PageCaptureController, StagingArea};
use folio_capture::NoDelay;
use pretty_assertions::assert_eq;

async fn staging() -> (tempfile::TempDir, StagingArea) {
    let root = tempfile::tempdir().unwrap();
    let staging = StagingArea::create(root.path()).await.unwrap();
    (root, staging)
}

#[tokio::test]
async fn test_first_attempt_success() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(1);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let captured = controller.capture(1, 3).await.unwrap();

    assert_eq!(captured.attempts.len(), 1);
    assert_eq!(captured.attempts[0].outcome, AttemptStatus::Success);
    assert_eq!(captured.artifact.page, 1);
    assert!(captured.artifact.path.ends_with("page_1.png"));
    assert_eq!(
        std::fs::read(&captured.artifact.path).unwrap().len(),
        captured.artifact.size
    );
    assert_eq!(
        surface.events(),
        vec![Event::Scroll(1), Event::Snapshot(1), Event::HideOverlay]
    );
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(2).failing(2, 2);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let captured = controller.capture(2, 3).await.unwrap();

    assert_eq!(captured.attempts.len(), 3);
    assert!(matches!(
        captured.attempts[0].outcome,
        AttemptStatus::TransientFailure { .. }
    ));
    assert!(matches!(
        captured.attempts[1].outcome,
        AttemptStatus::TransientFailure { .. }
    ));
    assert_eq!(captured.attempts[2].outcome, AttemptStatus::Success);
    assert_eq!(
        captured.attempts.iter().map(|a| a.attempt).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    assert_eq!(
        surface.events(),
        vec![
            Event::Scroll(2),
            Event::Nudge,
            Event::Scroll(2),
            Event::Nudge,
            Event::Scroll(2),
            Event::Snapshot(2),
            Event::HideOverlay,
        ]
    );
}

#[tokio::test]
async fn test_retries_exhausted() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(4).always_failing(4);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let err = controller.capture(4, 3).await.unwrap_err();

    match err {
        Error::Capture(CaptureError::RetriesExhausted {
            page,
            attempts,
            last_error,
        }) => {
            assert_eq!(page, 4);
            assert_eq!(attempts, 3);
            assert!(last_error.contains("#page_4"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(surface.attempts(4), 3);
    // No nudge after the final attempt
    let nudges = surface
        .events()
        .iter()
        .filter(|e| **e == Event::Nudge)
        .count();
    assert_eq!(nudges, 2);
    assert!(staging.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_attempts_never_exceed_ceiling() {
    for max_retries in 1..=5 {
        let (_root, staging) = staging().await;
        let surface = ScriptedSurface::with_pages(1).always_failing(1);
        let controller =
            PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

        assert!(controller.capture(1, max_retries).await.is_err());
        assert_eq!(surface.attempts(1), max_retries);
    }
}

#[tokio::test]
async fn test_zero_retries_makes_no_attempt() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(1);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let err = controller.capture(1, 0).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Capture(CaptureError::RetriesExhausted { attempts: 0, .. })
    ));
    assert!(surface.events().is_empty());
}

#[tokio::test]
async fn test_page_zero_rejected() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(1);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let err = controller.capture(0, 3).await.unwrap_err();
    assert!(matches!(err, Error::Capture(CaptureError::InvalidPage(0))));
    assert!(surface.events().is_empty());
}

#[tokio::test]
async fn test_terminal_error_stops_retrying() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(3).terminal(3);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let err = controller.capture(3, 3).await.unwrap_err();
    assert!(matches!(err, Error::Generic(_)));
    assert_eq!(surface.attempts(3), 1);
    assert!(!surface.events().contains(&Event::Nudge));
}

#[tokio::test]
async fn test_jpeg_artifact_extension() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(1);
    let options = CaptureOptions {
        format: folio_capture::browser::CaptureFormat::Jpeg,
        ..Default::default()
    };
    let controller = PageCaptureController::new(&surface, &NoDelay, &staging, options);

    let captured = controller.capture(1, 1).await.unwrap();
    assert!(captured.artifact.path.ends_with("page_1.jpg"));
}

#[tokio::test]
async fn test_snapshot_failure_is_retried() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(5).failing_at(5, Fault::Snapshot, 1);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let captured = controller.capture(5, 3).await.unwrap();

    assert_eq!(captured.attempts.len(), 2);
    assert_eq!(surface.attempts(5), 2);
    assert_eq!(
        surface.events(),
        vec![
            Event::Scroll(5),
            Event::Snapshot(5),
            Event::Nudge,
            Event::Scroll(5),
            Event::Snapshot(5),
            Event::HideOverlay,
        ]
    );
    assert_eq!(staging.list().unwrap(), vec![captured.artifact.path]);
}

#[tokio::test]
async fn test_empty_snapshot_is_retried() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(2).failing_at(2, Fault::EmptySnapshot, 1);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let captured = controller.capture(2, 3).await.unwrap();

    match &captured.attempts[0].outcome {
        AttemptStatus::TransientFailure { error } => assert!(error.contains("empty image")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(captured.attempts[1].outcome, AttemptStatus::Success);
    assert!(captured.artifact.size > 0);
    assert_eq!(staging.list().unwrap(), vec![captured.artifact.path]);
}

#[tokio::test]
async fn test_overlay_failure_rewrites_same_artifact() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(1).failing_at(1, Fault::HideOverlay, 2);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let captured = controller.capture(1, 3).await.unwrap();

    assert_eq!(captured.attempts.len(), 3);
    assert_eq!(
        surface.events(),
        vec![
            Event::Scroll(1),
            Event::Snapshot(1),
            Event::HideOverlay,
            Event::Nudge,
            Event::Scroll(1),
            Event::Snapshot(1),
            Event::HideOverlay,
            Event::Nudge,
            Event::Scroll(1),
            Event::Snapshot(1),
            Event::HideOverlay,
        ]
    );

    let files = staging.list().unwrap();
    assert_eq!(files, vec![captured.artifact.path.clone()]);
    assert!(files[0].ends_with("page_1.png"));
    assert_eq!(std::fs::read(&files[0]).unwrap().len(), captured.artifact.size);
}

#[tokio::test]
async fn test_overlay_failure_on_every_attempt_exhausts_retries() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(1).failing_at(1, Fault::HideOverlay, 3);
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let err = controller.capture(1, 3).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Capture(CaptureError::RetriesExhausted { attempts: 3, .. })
    ));
}

#[tokio::test]
async fn test_failed_nudge_does_not_change_outcome() {
    let (_root, staging) = staging().await;
    let surface = ScriptedSurface::with_pages(3).failing(3, 2).failing_nudges();
    let controller =
        PageCaptureController::new(&surface, &NoDelay, &staging, CaptureOptions::default());

    let captured = controller.capture(3, 3).await.unwrap();

    assert_eq!(captured.attempts.len(), 3);
    assert_eq!(captured.attempts[2].outcome, AttemptStatus::Success);
    let nudges = surface
        .events()
        .iter()
        .filter(|e| **e == Event::Nudge)
        .count();
    assert_eq!(nudges, 2);
    assert_eq!(staging.list().unwrap(), vec![captured.artifact.path]);
}
