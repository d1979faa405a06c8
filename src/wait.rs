//! Pacing between surface operations
//!
//! The viewer gives no readiness signal we can rely on, so the pipeline
//! paces itself with fixed pauses. All of them go through [`WaitPolicy`] so a
//! readiness-polling strategy can replace them without touching the retry
//! logic.

use std::time::Duration;
use tracing::trace;

/// Pauses taken by the capture pipeline
#[allow(async_fn_in_trait)]
pub trait WaitPolicy {
    /// After scrolling a page into view, before snapshotting it.
    async fn settle(&self);

    /// After a failed attempt, before the next one. `attempt` is 0-based.
    async fn backoff(&self, attempt: u32);

    /// Between the terminal outcome of one page and the first attempt of the next.
    async fn between_pages(&self);
}

/// Literal timed sleeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelays {
    /// Settle delay after scroll-into-view
    pub settle: Duration,
    /// Delay after a failed attempt
    pub backoff: Duration,
    /// Cooldown between pages
    pub cooldown: Duration,
}

impl Default for FixedDelays {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(100),
            backoff: Duration::from_secs(1),
            cooldown: Duration::from_millis(100),
        }
    }
}

impl WaitPolicy for FixedDelays {
    async fn settle(&self) {
        tokio::time::sleep(self.settle).await;
    }

    async fn backoff(&self, attempt: u32) {
        trace!(attempt, delay_ms = self.backoff.as_millis() as u64, "Backing off");
        tokio::time::sleep(self.backoff).await;
    }

    async fn between_pages(&self) {
        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }
    }
}

/// Never waits. Used for surfaces that are ready immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl WaitPolicy for NoDelay {
    async fn settle(&self) {}

    async fn backoff(&self, _attempt: u32) {}

    async fn between_pages(&self) {}
}
