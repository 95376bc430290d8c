//! Polling observer that republishes the host snapshot.
//!
//! The host offers no change notification, so the observer re-reads the
//! snapshot on every tick and overwrites the published copy without
//! diffing. A change on the host becomes visible no later than one poll
//! interval after it happens.
//!
//! Ticks are driven from outside: `bodyfat-io` runs them on a browser
//! interval timer, tests call [`SnapshotObserver::tick`] directly.

use std::time::Duration;

use web_time::Instant;

use crate::host::HostBridge;
use crate::snapshot::HostSnapshot;

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Republishes a host snapshot at a fixed cadence.
#[derive(Debug)]
pub struct SnapshotObserver<H> {
    host: Option<H>,
    published: HostSnapshot,
    published_at: Instant,
    interval: Duration,
    polls: u64,
    stopped: bool,
}

impl<H: HostBridge> SnapshotObserver<H> {
    /// Read the snapshot once and publish it.
    ///
    /// With no host the default snapshot is published and the observer
    /// never polls.
    #[must_use]
    pub fn mount(host: Option<H>, interval: Duration) -> Self {
        let published = host.as_ref().map(H::snapshot).unwrap_or_default();
        if host.is_none() {
            tracing::debug!("host bridge absent; publishing default snapshot without polling");
        }
        Self {
            host,
            published,
            published_at: Instant::now(),
            interval,
            polls: 0,
            stopped: false,
        }
    }

    /// Whether ticks still read from the host.
    #[must_use]
    pub const fn is_polling(&self) -> bool {
        self.host.is_some() && !self.stopped
    }

    /// Re-read the host and overwrite the published snapshot.
    ///
    /// Returns the new snapshot, or `None` when the observer is not
    /// polling (host absent or stopped).
    pub fn tick(&mut self) -> Option<&HostSnapshot> {
        if self.stopped {
            return None;
        }
        let host = self.host.as_ref()?;
        let now = Instant::now();
        let gap = now.duration_since(self.published_at);
        if gap > self.interval * 2 {
            tracing::debug!(?gap, interval = ?self.interval, "snapshot poll delayed");
        }
        self.published = host.snapshot();
        self.published_at = now;
        self.polls += 1;
        Some(&self.published)
    }

    /// The most recently published snapshot.
    #[must_use]
    pub const fn current(&self) -> &HostSnapshot {
        &self.published
    }

    /// Stop polling for good. Called on teardown.
    pub fn stop(&mut self) {
        if !self.stopped {
            tracing::debug!(polls = self.polls, "snapshot observer stopped");
        }
        self.stopped = true;
    }

    /// Time since the published snapshot was read from the host.
    ///
    /// Stays below the poll interval while the timer runs on schedule.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.published_at.elapsed()
    }

    /// Poll cadence.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of host reads performed by [`tick`](Self::tick).
    #[must_use]
    pub const fn polls(&self) -> u64 {
        self.polls
    }

    /// The observed host, if present.
    #[must_use]
    pub const fn host(&self) -> Option<&H> {
        self.host.as_ref()
    }
}
